//! Axum router wiring.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{api, app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(ops::health))
        .route("/version", get(ops::version))
        .route("/metrics", get(ops::metrics))
        .route("/api/v1/version", get(api::version::api_version))
        .route("/api/v1/score", post(api::score::score))
        .route("/api/v1/backtest", post(api::backtest::backtest))
        .route("/api/v1/stream", get(api::stream::stream))
        .route("/signal", get(api::signal::signal))
        .route("/signal/", get(api::signal::signal))
        .layer(middleware::from_fn_with_state(state.clone(), obs::timing::track_requests))
        .with_state(state)
}
