use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validated OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Epoch seconds.
    pub ts: i64,
    /// ISO-8601 UTC rendering of `ts`.
    pub time: String,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Bar as delivered by a provider, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBar {
    pub ts: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Render epoch seconds as RFC 3339 UTC. Out-of-range values yield `None`.
pub fn iso_utc(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|t| t.to_rfc3339())
}

/// Check a single raw bar and return the normalised bar, or `None` if it is
/// incomplete, non-finite, or its open/close fall outside `[low, high]`.
pub fn validate_bar(raw: &RawBar, symbol: &str) -> Option<Bar> {
    let (open, high, low, close) = (raw.open?, raw.high?, raw.low?, raw.close?);
    if ![open, high, low, close].iter().all(|v| v.is_finite()) {
        return None;
    }
    if !(low <= open && open <= high && low <= close && close <= high) {
        return None;
    }
    let volume = match raw.volume {
        Some(v) if v.is_finite() && v > 0.0 => v as u64,
        _ => 0,
    };
    Some(Bar {
        ts: raw.ts,
        time: iso_utc(raw.ts)?,
        symbol: symbol.to_uppercase(),
        open,
        high,
        low,
        close,
        volume,
    })
}
