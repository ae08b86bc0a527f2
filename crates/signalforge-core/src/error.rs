//! Shared error type across SignalForge crates.

use serde::Serialize;
use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Symbol failed normalisation.
    InvalidSymbol,
    /// Interval is not one of the supported bar sizes.
    InvalidInterval,
    /// Invalid input / malformed request.
    BadRequest,
    /// Not enough bars to build a single complete feature row.
    InsufficientData,
    /// Market data is older than the caller tolerates.
    StaleData,
    /// Upstream or local rate limit hit.
    RateLimit,
    /// Upstream provider did not answer in time.
    UpstreamTimeout,
    /// Upstream provider answered with an error.
    UpstreamError,
    /// Model artifacts are missing or unreadable.
    ModelUnavailable,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidSymbol => "INVALID_SYMBOL",
            ErrorCode::InvalidInterval => "INVALID_INTERVAL",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InsufficientData => "INSUFFICIENT_DATA",
            ErrorCode::StaleData => "STALE_DATA",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::ModelUnavailable => "MODEL_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SignalForgeError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum SignalForgeError {
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("unsupported interval: {0}")]
    InvalidInterval(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("stale data: {0}")]
    StaleData(String),
    #[error("rate limited")]
    RateLimited,
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SignalForgeError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ErrorCode {
        match self {
            SignalForgeError::InvalidSymbol(_) => ErrorCode::InvalidSymbol,
            SignalForgeError::InvalidInterval(_) => ErrorCode::InvalidInterval,
            SignalForgeError::BadRequest(_) => ErrorCode::BadRequest,
            SignalForgeError::InsufficientData(_) => ErrorCode::InsufficientData,
            SignalForgeError::StaleData(_) => ErrorCode::StaleData,
            SignalForgeError::RateLimited => ErrorCode::RateLimit,
            SignalForgeError::UpstreamTimeout(_) => ErrorCode::UpstreamTimeout,
            SignalForgeError::Upstream(_) => ErrorCode::UpstreamError,
            SignalForgeError::ModelUnavailable(_) => ErrorCode::ModelUnavailable,
            SignalForgeError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Optional remediation hint surfaced next to the message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SignalForgeError::InvalidInterval(_) => {
                Some("use one of 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d")
            }
            SignalForgeError::InsufficientData(_) => {
                Some("request more bars (limit) so indicators can warm up")
            }
            SignalForgeError::ModelUnavailable(_) => {
                Some("train with `sfctl train --save-artifacts` or point model.dir at existing artifacts")
            }
            SignalForgeError::RateLimited => Some("retry later or use synthetic=1"),
            _ => None,
        }
    }
}
