//! SignalForge gateway library entry.
//!
//! Wires config, the market data client, the loaded predictor and the HTTP
//! routes into one axum service. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod data;
pub mod error;
pub mod obs;
pub mod ops;
pub mod router;
