//! Top-level facade crate for SignalForge.
//!
//! Re-exports core types and the gateway library so users can depend on a
//! single crate. Also ships the `sfctl` offline tool.

pub mod core {
    pub use signalforge_core::*;
}

pub mod gateway {
    pub use signalforge_gateway::*;
}
