use serde::Serialize;

use crate::error::{Result, SignalForgeError};
use crate::market::Bar;

use super::indicators::{pct_change, rolling_std, rsi, sma};

/// Column order the classifier is trained on.
pub const FEATURE_NAMES: [&str; 9] = [
    "ret_1",
    "ret_3",
    "sma_5",
    "sma_10",
    "sma_20",
    "rsi_14",
    "vol_10",
    "typ_price",
    "tp_sma_10",
];

/// Every column a [`FeatureRow`] exposes by name.
pub const COLUMNS: [&str; 14] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "typ_price",
    "ret_1",
    "ret_3",
    "sma_5",
    "sma_10",
    "sma_20",
    "rsi_14",
    "vol_10",
    "tp_sma_10",
];

/// Row-major feature matrix.
pub type Matrix = Vec<Vec<f64>>;

/// One complete feature row (warm-up rows never make it into a frame).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub ts: i64,
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub typ_price: f64,
    pub ret_1: f64,
    pub ret_3: f64,
    pub sma_5: f64,
    pub sma_10: f64,
    pub sma_20: f64,
    pub rsi_14: f64,
    pub vol_10: f64,
    pub tp_sma_10: f64,
}

impl FeatureRow {
    /// Column lookup by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let v = match name {
            "open" => self.open,
            "high" => self.high,
            "low" => self.low,
            "close" => self.close,
            "volume" => self.volume,
            "typ_price" => self.typ_price,
            "ret_1" => self.ret_1,
            "ret_3" => self.ret_3,
            "sma_5" => self.sma_5,
            "sma_10" => self.sma_10,
            "sma_20" => self.sma_20,
            "rsi_14" => self.rsi_14,
            "vol_10" => self.vol_10,
            "tp_sma_10" => self.tp_sma_10,
            _ => return None,
        };
        Some(v)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureFrame {
    pub rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Build a matrix with columns in `names` order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Matrix> {
        let missing: Vec<&str> = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| !COLUMNS.contains(n))
            .collect();
        if !missing.is_empty() {
            return Err(SignalForgeError::BadRequest(format!(
                "missing required feature columns: {missing:?}"
            )));
        }
        Ok(self
            .rows
            .iter()
            .map(|r| names.iter().filter_map(|n| r.get(n.as_ref())).collect())
            .collect())
    }
}

/// Normalise bars into model features. Bars are ordered by timestamp first;
/// rows with any undefined indicator (warm-up) are dropped.
///
/// `vol_10` is the 10-bar sample std of `ret_1`, the same definition the
/// offline dataset builder uses.
pub fn build_features(bars: &[Bar]) -> FeatureFrame {
    let mut sorted: Vec<&Bar> = bars.iter().collect();
    sorted.sort_by_key(|b| b.ts);

    let close: Vec<f64> = sorted.iter().map(|b| b.close).collect();
    let typ: Vec<f64> = sorted.iter().map(|b| (b.high + b.low + b.close) / 3.0).collect();

    let ret_1 = pct_change(&close, 1);
    let ret_3 = pct_change(&close, 3);
    let sma_5 = sma(&close, 5);
    let sma_10 = sma(&close, 10);
    let sma_20 = sma(&close, 20);
    let rsi_14 = rsi(&close, 14);
    let vol_10 = rolling_std(&ret_1, 10);
    let tp_sma_10 = sma(&typ, 10);

    let mut rows = Vec::new();
    for (i, bar) in sorted.iter().enumerate() {
        let cols = (
            ret_1[i], ret_3[i], sma_5[i], sma_10[i], sma_20[i], rsi_14[i], vol_10[i], tp_sma_10[i],
        );
        let (
            Some(ret_1),
            Some(ret_3),
            Some(sma_5),
            Some(sma_10),
            Some(sma_20),
            Some(rsi_14),
            Some(vol_10),
            Some(tp_sma_10),
        ) = cols
        else {
            continue;
        };
        rows.push(FeatureRow {
            ts: bar.ts,
            time: bar.time.clone(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume as f64,
            typ_price: typ[i],
            ret_1,
            ret_3,
            sma_5,
            sma_10,
            sma_20,
            rsi_14,
            vol_10,
            tp_sma_10,
        });
    }
    FeatureFrame { rows }
}
