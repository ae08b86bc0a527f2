//! Observability: in-process metrics, request timing and log setup.

pub mod logging;
pub mod metrics;
pub mod timing;
