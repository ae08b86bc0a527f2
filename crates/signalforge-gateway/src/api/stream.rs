//! `GET /api/v1/stream`: server-sent events, one score per tick.
//!
//! The stream ends when the client disconnects (axum drops it) or after
//! `max_events` frames.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::rejection::QueryRejection,
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;

use signalforge_core::error::{Result, SignalForgeError};
use signalforge_core::market::{normalize_symbol, Interval, SyntheticMode};
use signalforge_core::scoring::{check_threshold, parse_flag, score_series};

use crate::app_state::AppState;
use crate::error::ApiResult;

use super::query_params;

const MIN_REFRESH_SEC: f64 = 0.1;
const MAX_REFRESH_SEC: f64 = 60.0;
const MAX_LIMIT: usize = signalforge_core::scoring::MAX_LIMIT;

fn default_symbol() -> String {
    "AAPL".into()
}
fn default_interval() -> String {
    "5m".into()
}
fn default_limit() -> usize {
    300
}
fn default_threshold() -> f64 {
    0.20
}
fn default_mode() -> String {
    "flat".into()
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Truthy strings: 1/true/yes/y/on.
    #[serde(default)]
    pub synthetic: Option<String>,
    #[serde(default = "default_mode")]
    pub synthetic_mode: String,
    #[serde(default)]
    pub refresh_sec: Option<f64>,
    #[serde(default)]
    pub max_events: Option<usize>,
}

#[derive(Debug, Clone)]
struct Tick {
    symbol: String,
    interval: Interval,
    limit: usize,
    threshold: f64,
    synthetic: bool,
    mode: SyntheticMode,
    refresh: Duration,
    max_events: Option<usize>,
}

impl StreamQuery {
    fn resolve(self, default_refresh_sec: f64) -> Result<Tick> {
        check_threshold(Some(self.threshold))?;
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(SignalForgeError::BadRequest(format!(
                "limit must be within 1..={MAX_LIMIT}"
            )));
        }
        let refresh = self.refresh_sec.unwrap_or(default_refresh_sec);
        if !refresh.is_finite() {
            return Err(SignalForgeError::BadRequest("refresh_sec must be a number".into()));
        }
        Ok(Tick {
            symbol: normalize_symbol(&self.symbol)?,
            interval: Interval::parse(&self.interval)?,
            limit: self.limit,
            threshold: self.threshold,
            synthetic: self.synthetic.as_deref().map(parse_flag).unwrap_or(false),
            mode: SyntheticMode::parse(&self.synthetic_mode),
            refresh: Duration::from_secs_f64(refresh.clamp(MIN_REFRESH_SEC, MAX_REFRESH_SEC)),
            max_events: self.max_events,
        })
    }
}

async fn score_once(state: &AppState, t: &Tick) -> Result<serde_json::Value> {
    let predictor = state.predictor()?;
    let series = state
        .data()
        .fetch(&t.symbol, t.interval, t.limit, t.synthetic, t.mode)
        .await?;
    let report = score_series(&series, &predictor, Some(t.threshold))?;
    state.metrics().scores.inc(&[]);
    serde_json::to_value(report).map_err(|e| SignalForgeError::Internal(e.to_string()))
}

/// Score payload, or `{"error": "..."}` so the stream keeps going.
async fn next_payload(state: &AppState, t: &Tick) -> serde_json::Value {
    match score_once(state, t).await {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(symbol = %t.symbol, error = %e, "stream tick failed");
            json!({ "error": e.to_string() })
        }
    }
}

pub async fn stream(
    State(state): State<AppState>,
    query: std::result::Result<Query<StreamQuery>, QueryRejection>,
) -> ApiResult<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let tick = Arc::new(query_params(query)?.resolve(state.cfg().stream.default_refresh_sec)?);
    tracing::info!(symbol = %tick.symbol, interval = %tick.interval, refresh = ?tick.refresh, "stream opened");

    let events = stream::unfold((state, tick, 0usize), |(state, tick, sent)| async move {
        if tick.max_events.is_some_and(|max| sent >= max) {
            return None;
        }
        if sent > 0 {
            tokio::time::sleep(tick.refresh).await;
        }
        let payload = next_payload(&state, &tick).await;
        let event = Event::default().data(payload.to_string());
        Some((Ok(event), (state, tick, sent + 1)))
    });

    Ok(Sse::new(events))
}
