//! Market data primitives.
//!
//! - `bar`: OHLCV bar type and validation
//! - `interval`: supported bar sizes and symbol normalisation
//! - `synthetic`: random-walk and ramp generators used when live data is off
//! - `yahoo`: Yahoo v8 chart response normalisation

pub mod bar;
pub mod interval;
pub mod synthetic;
pub mod yahoo;

use serde::{Deserialize, Serialize};

pub use bar::{validate_bar, Bar, RawBar};
pub use interval::{normalize_symbol, Interval};
pub use synthetic::{ramp_closes, synthetic_bars, SyntheticMode};
pub use yahoo::normalize_yahoo_chart;

/// A fetched candle series, oldest bar first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub interval: Interval,
    pub as_of: String,
    pub candles: Vec<Bar>,
}

impl Series {
    /// Series truncated to its first `limit` bars (used for replay prefixes).
    pub fn prefix(&self, limit: usize) -> Series {
        let n = limit.min(self.candles.len());
        Series {
            symbol: self.symbol.clone(),
            interval: self.interval,
            as_of: self.as_of.clone(),
            candles: self.candles[..n].to_vec(),
        }
    }

    /// Keep only the newest `limit` bars.
    pub fn keep_last(mut self, limit: usize) -> Series {
        if self.candles.len() > limit {
            let drop = self.candles.len() - limit;
            self.candles.drain(..drop);
        }
        self
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|b| b.close).collect()
    }
}
