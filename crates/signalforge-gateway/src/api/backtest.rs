//! `POST /api/v1/backtest`: replay the scoring path over growing prefixes of
//! one fetched series.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::Utc;

use signalforge_core::backtest::{replay, summarize, BacktestReport, BacktestRequest, Runtime};
use signalforge_core::SignalForgeError;

use crate::app_state::AppState;
use crate::error::ApiResult;

use super::json_body;

/// Flags the replay to stop when the handler future is dropped, which is
/// what happens when the client goes away mid-request.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub async fn backtest(
    State(state): State<AppState>,
    body: Result<Json<BacktestRequest>, JsonRejection>,
) -> ApiResult<Json<BacktestReport>> {
    let params = json_body(body)?;
    let (symbol, interval) = params.validate()?;
    let predictor = state.predictor()?;

    let started_at = Utc::now().to_rfc3339();
    let series = state
        .data()
        .fetch(
            &symbol,
            interval,
            params.total_bars(),
            params.synthetic,
            params.synthetic_mode,
        )
        .await?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(Arc::clone(&cancelled));

    let req = params.clone();
    let (records, artifact_hashes) = tokio::task::spawn_blocking(move || {
        replay(&series, &predictor, &req, || cancelled.load(Ordering::Relaxed))
    })
    .await
    .map_err(|e| SignalForgeError::Internal(format!("backtest task failed: {e}")))?;

    let summary = summarize(&records);
    tracing::info!(
        %symbol,
        steps = records.len(),
        last_pred_1 = summary.last_pred_1,
        "backtest finished"
    );

    Ok(Json(BacktestReport {
        params,
        runtime: Runtime {
            started_at,
            ended_at: Utc::now().to_rfc3339(),
        },
        n_steps: records.len(),
        summary,
        artifact_hashes,
        records,
    }))
}
