//! `GET /signal/`: rule-based baseline (SMA crossover gated by RSI).
//!
//! Runs without model artifacts. `synthetic=1` uses a deterministic close
//! ramp instead of the market data client.

use axum::{extract::rejection::QueryRejection, extract::Query, extract::State, Json};
use serde::{Deserialize, Serialize};

use signalforge_core::error::{Result, SignalForgeError};
use signalforge_core::market::{ramp_closes, Interval, SyntheticMode};
use signalforge_core::scoring::parse_flag;
use signalforge_core::signal::{compute_baseline, BaselineFeatures};

use crate::app_state::AppState;
use crate::error::ApiResult;

use super::query_params;

pub const BASELINE_SOURCE: &str = "baseline_v1";
pub const BASELINE_VERSION: &str = "0.0.1";

fn default_interval() -> String {
    "5m".into()
}
fn default_limit() -> usize {
    200
}
fn default_fast() -> usize {
    20
}
fn default_slow() -> usize {
    50
}
fn default_mode() -> String {
    "up".into()
}

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_fast")]
    pub sma_fast: usize,
    #[serde(default = "default_slow")]
    pub sma_slow: usize,
    #[serde(default)]
    pub synthetic: Option<String>,
    #[serde(default = "default_mode")]
    pub synthetic_mode: String,
}

fn in_range(name: &str, v: usize, lo: usize, hi: usize) -> Result<()> {
    if (lo..=hi).contains(&v) {
        Ok(())
    } else {
        Err(SignalForgeError::BadRequest(format!("{name} must be within {lo}..={hi}, got {v}")))
    }
}

impl SignalQuery {
    pub fn validate(&self) -> Result<Interval> {
        in_range("limit", self.limit, 20, 1000)?;
        in_range("sma_fast", self.sma_fast, 2, 200)?;
        in_range("sma_slow", self.sma_slow, 3, 400)?;
        Interval::parse(&self.interval)
    }
}

#[derive(Debug, Serialize)]
pub struct SignalMeta {
    pub source: &'static str,
    pub model_version: &'static str,
    pub data_source: String,
}

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub symbol: String,
    pub interval: Interval,
    pub limit: usize,
    pub features: BaselineFeatures,
    pub meta: SignalMeta,
}

pub async fn signal(
    State(state): State<AppState>,
    query: std::result::Result<Query<SignalQuery>, QueryRejection>,
) -> ApiResult<Json<SignalResponse>> {
    let q = query_params(query)?;
    let interval = q.validate()?;
    let synthetic = q.synthetic.as_deref().map(parse_flag).unwrap_or(false);

    let (symbol, closes, data_source) = if synthetic {
        let mode = SyntheticMode::parse(&q.synthetic_mode);
        (
            q.symbol.trim().to_uppercase(),
            ramp_closes(q.limit, mode),
            format!("synthetic:{}", mode.as_str()),
        )
    } else {
        let series = state
            .data()
            .fetch(&q.symbol, interval, q.limit, false, SyntheticMode::default())
            .await?;
        let closes = series.closes();
        (series.symbol, closes, "live_client".to_string())
    };

    let features = compute_baseline(&closes, q.sma_fast, q.sma_slow)?;
    Ok(Json(SignalResponse {
        symbol,
        interval,
        limit: q.limit,
        features,
        meta: SignalMeta {
            source: BASELINE_SOURCE,
            model_version: BASELINE_VERSION,
            data_source,
        },
    }))
}
