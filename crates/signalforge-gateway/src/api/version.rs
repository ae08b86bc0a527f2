use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct ApiVersion {
    pub service_version: String,
    pub model_version: Option<String>,
    pub dataset_version: Option<String>,
    pub artifact_hashes: BTreeMap<String, String>,
    pub feature_count: usize,
}

/// `GET /api/v1/version`: identity of the currently loaded artifacts.
pub async fn api_version(State(state): State<AppState>) -> ApiResult<Json<ApiVersion>> {
    let p = state.predictor()?;
    let meta = p.meta();
    Ok(Json(ApiVersion {
        service_version: state.cfg().server.service_version.clone(),
        model_version: meta.model_version.clone(),
        dataset_version: meta.dataset_version.clone(),
        artifact_hashes: p.artifact_hashes().clone(),
        feature_count: p.feature_names().map(<[String]>::len).unwrap_or_else(|| p.n_features()),
    }))
}
