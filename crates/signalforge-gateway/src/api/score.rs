use axum::{extract::rejection::JsonRejection, extract::State, Json};

use signalforge_core::scoring::{score_series, ScoreReport, ScoreRequest};

use crate::app_state::AppState;
use crate::error::ApiResult;

use super::json_body;

/// `POST /api/v1/score`
pub async fn score(
    State(state): State<AppState>,
    body: Result<Json<ScoreRequest>, JsonRejection>,
) -> ApiResult<Json<ScoreReport>> {
    let req = json_body(body)?.validate()?;
    let predictor = state.predictor()?;
    let series = state
        .data()
        .fetch(&req.symbol, req.interval, req.limit, req.synthetic, req.synthetic_mode)
        .await?;

    let report = score_series(&series, &predictor, req.threshold)?;
    state.metrics().scores.inc(&[]);
    tracing::debug!(
        symbol = %report.symbol,
        rows = report.n_rows_scored,
        proba = report.last.proba,
        "scored"
    );
    Ok(Json(report))
}
