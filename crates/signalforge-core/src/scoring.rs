//! Score a candle series with the loaded classifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SignalForgeError};
use crate::features::build_features;
use crate::market::{normalize_symbol, Interval, Series, SyntheticMode};
use crate::model::Predictor;

pub const MAX_LIMIT: usize = 5000;

fn default_limit() -> usize {
    300
}

fn default_up() -> SyntheticMode {
    SyntheticMode::Up
}

/// Accept `0/1`, `true/false`, and the usual truthy strings.
pub fn deserialize_flag<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }
    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Str(s) => parse_flag(&s),
    })
}

pub fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub symbol: String,
    pub interval: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub synthetic: bool,
    #[serde(default = "default_up")]
    pub synthetic_mode: SyntheticMode,
}

/// A score request after symbol/interval normalisation and range checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidScoreRequest {
    pub symbol: String,
    pub interval: Interval,
    pub limit: usize,
    pub threshold: Option<f64>,
    pub synthetic: bool,
    pub synthetic_mode: SyntheticMode,
}

pub fn check_threshold(threshold: Option<f64>) -> Result<()> {
    match threshold {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(SignalForgeError::BadRequest(format!(
            "threshold must be within [0, 1], got {t}"
        ))),
        _ => Ok(()),
    }
}

impl ScoreRequest {
    pub fn validate(&self) -> Result<ValidScoreRequest> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(SignalForgeError::BadRequest(format!(
                "limit must be within 1..={MAX_LIMIT}, got {}",
                self.limit
            )));
        }
        check_threshold(self.threshold)?;
        Ok(ValidScoreRequest {
            symbol: normalize_symbol(&self.symbol)?,
            interval: Interval::parse(&self.interval)?,
            limit: self.limit,
            threshold: self.threshold,
            synthetic: self.synthetic,
            synthetic_mode: self.synthetic_mode,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastPrediction {
    pub time: Option<String>,
    pub proba: f64,
    pub pred: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredCounts {
    pub pred_0: usize,
    pub pred_1: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub symbol: String,
    pub interval: Interval,
    pub n_rows_scored: usize,
    pub threshold: f64,
    pub last: LastPrediction,
    pub counts: PredCounts,
    pub model_version: Option<String>,
    pub dataset_version: Option<String>,
    pub artifact_hashes: BTreeMap<String, String>,
}

/// Build features for the whole series and score every complete row.
pub fn score_series(series: &Series, predictor: &Predictor, threshold: Option<f64>) -> Result<ScoreReport> {
    check_threshold(threshold)?;
    let frame = build_features(&series.candles);
    let Some(last_row) = frame.last() else {
        return Err(SignalForgeError::InsufficientData(format!(
            "{} bars yield no complete feature rows",
            series.candles.len()
        )));
    };
    let last_time = last_row.time.clone();

    let x = predictor.prepare(&frame)?;
    let thr = threshold.unwrap_or_else(|| predictor.default_threshold());
    let proba = predictor.predict_proba(&x)?;
    let pred: Vec<u8> = proba.iter().map(|p| u8::from(*p >= thr)).collect();

    let pred_1 = pred.iter().filter(|p| **p == 1).count();
    let (Some(&last_proba), Some(&last_pred)) = (proba.last(), pred.last()) else {
        return Err(SignalForgeError::Internal("empty prediction vector".into()));
    };

    let meta = predictor.meta();
    Ok(ScoreReport {
        symbol: series.symbol.clone(),
        interval: series.interval,
        n_rows_scored: frame.len(),
        threshold: thr,
        last: LastPrediction {
            time: Some(last_time),
            proba: last_proba,
            pred: last_pred,
        },
        counts: PredCounts {
            pred_0: pred.len() - pred_1,
            pred_1,
        },
        model_version: meta.model_version.clone(),
        dataset_version: meta.dataset_version.clone(),
        artifact_hashes: predictor.artifact_hashes().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(json: &str) -> ScoreRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_and_flag_shapes() {
        let r = req(r#"{"symbol": "aapl", "interval": "5m"}"#);
        assert_eq!(r.limit, 300);
        assert!(!r.synthetic);
        assert_eq!(r.synthetic_mode, SyntheticMode::Up);

        assert!(req(r#"{"symbol": "a", "interval": "5m", "synthetic": 1}"#).synthetic);
        assert!(req(r#"{"symbol": "a", "interval": "5m", "synthetic": true}"#).synthetic);
        assert!(req(r#"{"symbol": "a", "interval": "5m", "synthetic": "yes"}"#).synthetic);
        assert!(!req(r#"{"symbol": "a", "interval": "5m", "synthetic": "0"}"#).synthetic);
    }

    #[test]
    fn synthetic_mode_is_case_insensitive_and_lenient() {
        let r = req(r#"{"symbol": "a", "interval": "5m", "synthetic_mode": "UP"}"#);
        assert_eq!(r.synthetic_mode, SyntheticMode::Up);
        let r = req(r#"{"symbol": "a", "interval": "5m", "synthetic_mode": "Down"}"#);
        assert_eq!(r.synthetic_mode, SyntheticMode::Down);
        let r = req(r#"{"symbol": "a", "interval": "5m", "synthetic_mode": "random"}"#);
        assert_eq!(r.synthetic_mode, SyntheticMode::Flat);
    }

    #[test]
    fn validate_ranges() {
        let ok = req(r#"{"symbol": " msft", "interval": "5", "threshold": 0.3}"#).validate().unwrap();
        assert_eq!(ok.symbol, "MSFT");
        assert_eq!(ok.interval, Interval::M5);

        let e = req(r#"{"symbol": "a", "interval": "5m", "limit": 0}"#).validate().unwrap_err();
        assert_eq!(e.client_code().as_str(), "BAD_REQUEST");
        let e = req(r#"{"symbol": "a", "interval": "5m", "threshold": 1.5}"#).validate().unwrap_err();
        assert_eq!(e.client_code().as_str(), "BAD_REQUEST");
        let e = req(r#"{"symbol": "a", "interval": "7m"}"#).validate().unwrap_err();
        assert_eq!(e.client_code().as_str(), "INVALID_INTERVAL");
    }
}
