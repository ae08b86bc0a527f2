//! Deterministic replay of the scoring path over growing prefixes of one
//! series.
//!
//! Step `i` scores the first `window + i * step_size` bars. A failing step
//! records its error and the replay continues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalForgeError};
use crate::market::{normalize_symbol, Interval, Series, SyntheticMode};
use crate::model::Predictor;
use crate::scoring::{check_threshold, deserialize_flag, score_series, LastPrediction, PredCounts};

pub const MAX_STEPS: usize = 1000;

fn default_symbol() -> String {
    "AAPL".into()
}
fn default_interval() -> String {
    "5m".into()
}
fn default_threshold() -> f64 {
    0.20
}
fn default_window() -> usize {
    300
}
fn default_steps() -> usize {
    50
}
fn default_step_size() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRequest {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Lookback length of the first step.
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Bars the window grows by each step.
    #[serde(default = "default_step_size")]
    pub step_size: usize,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub synthetic: bool,
    #[serde(default)]
    pub synthetic_mode: SyntheticMode,
}

impl Default for BacktestRequest {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            interval: default_interval(),
            threshold: default_threshold(),
            window: default_window(),
            steps: default_steps(),
            step_size: default_step_size(),
            synthetic: false,
            synthetic_mode: SyntheticMode::Flat,
        }
    }
}

impl BacktestRequest {
    /// Range checks; returns the normalised symbol and interval.
    pub fn validate(&self) -> Result<(String, Interval)> {
        check_threshold(Some(self.threshold))?;
        if self.window == 0 || self.step_size == 0 {
            return Err(SignalForgeError::BadRequest("window and step_size must be >= 1".into()));
        }
        if !(1..=MAX_STEPS).contains(&self.steps) {
            return Err(SignalForgeError::BadRequest(format!(
                "steps must be within 1..={MAX_STEPS}"
            )));
        }
        if self.total_bars() > crate::scoring::MAX_LIMIT {
            return Err(SignalForgeError::BadRequest(format!(
                "window + (steps-1)*step_size must not exceed {}",
                crate::scoring::MAX_LIMIT
            )));
        }
        Ok((normalize_symbol(&self.symbol)?, Interval::parse(&self.interval)?))
    }

    /// Bars needed for the final step.
    pub fn total_bars(&self) -> usize {
        self.window
            .saturating_add(self.steps.saturating_sub(1).saturating_mul(self.step_size))
    }

    pub fn limit_at(&self, step: usize) -> usize {
        self.window + step * self.step_size
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub limit: usize,
    pub last: Option<LastPrediction>,
    pub counts: Option<PredCounts>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BacktestSummary {
    pub last_pred_0: usize,
    pub last_pred_1: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runtime {
    pub started_at: String,
    pub ended_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub params: BacktestRequest,
    pub runtime: Runtime,
    pub n_steps: usize,
    pub summary: BacktestSummary,
    pub artifact_hashes: Option<BTreeMap<String, String>>,
    pub records: Vec<StepRecord>,
}

/// Replay `req.steps` scoring steps over prefixes of `series`.
/// `should_stop` is polled between steps so callers can abort on disconnect.
pub fn replay(
    series: &Series,
    predictor: &Predictor,
    req: &BacktestRequest,
    mut should_stop: impl FnMut() -> bool,
) -> (Vec<StepRecord>, Option<BTreeMap<String, String>>) {
    let mut records = Vec::with_capacity(req.steps);
    let mut hashes = None;

    for step in 0..req.steps {
        if should_stop() {
            tracing::debug!(step, "backtest replay stopped early");
            break;
        }
        let limit = req.limit_at(step);
        let prefix = series.prefix(limit);
        let rec = match score_series(&prefix, predictor, Some(req.threshold)) {
            Ok(report) => {
                hashes = Some(report.artifact_hashes);
                StepRecord {
                    step,
                    limit,
                    last: Some(report.last),
                    counts: Some(report.counts),
                    error: None,
                }
            }
            Err(e) => StepRecord {
                step,
                limit,
                last: None,
                counts: None,
                error: Some(e.to_string()),
            },
        };
        records.push(rec);
    }
    (records, hashes)
}

pub fn summarize(records: &[StepRecord]) -> BacktestSummary {
    let mut s = BacktestSummary::default();
    for last in records.iter().filter_map(|r| r.last.as_ref()) {
        match last.pred {
            0 => s.last_pred_0 += 1,
            _ => s.last_pred_1 += 1,
        }
    }
    s
}
