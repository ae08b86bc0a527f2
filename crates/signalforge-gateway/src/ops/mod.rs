//! Operational HTTP endpoints.
//!
//! - `/health`  : artifact presence (`ok` / `degraded`)
//! - `/version` : service, model and build identifiers
//! - `/metrics` : Prometheus-style text

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;

pub const SERVICE_NAME: &str = "signalforge";
/// Identifier of the feature pipeline served by this build.
pub const FEATURESET: &str = "ta_basic_v1";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub as_of: String,
    pub service: &'static str,
    pub model_file: bool,
    pub scaler_file: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let paths = state.artifacts();
    let model_file = paths.model_path.exists();
    let scaler_file = paths.scaler_path.exists();
    Json(HealthResponse {
        status: if model_file && scaler_file { "ok" } else { "degraded" },
        as_of: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
        model_file,
        scaler_file,
    })
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub service: String,
    pub model_version: String,
    pub featureset: &'static str,
    pub commit: String,
    pub build_time: String,
}

pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    let server = &state.cfg().server;
    Json(VersionResponse {
        service: format!("{SERVICE_NAME}:{}", server.service_version),
        model_version: state.startup_model_version().to_string(),
        featureset: FEATURESET,
        commit: server.commit.clone(),
        build_time: state.build_time().to_string(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics().render();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
