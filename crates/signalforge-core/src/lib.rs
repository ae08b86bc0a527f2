//! SignalForge core: market data primitives, feature engineering, the
//! classifier runtime, scoring and backtest replay.
//!
//! This crate carries no transport or async runtime dependencies so the same
//! scoring path serves the HTTP gateway and the offline CLI.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed bars, artifacts, or requests surface as `SignalForgeError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod backtest;
pub mod error;
pub mod features;
pub mod market;
pub mod model;
pub mod scoring;
pub mod signal;

/// Shared result type.
pub use error::{ErrorCode, Result, SignalForgeError};
