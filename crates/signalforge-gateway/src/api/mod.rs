//! Model-backed API routes and the baseline signal.
//!
//! Extractor rejections are folded into the JSON error envelope so every
//! route answers with the same error shape.

pub mod backtest;
pub mod score;
pub mod signal;
pub mod stream;
pub mod version;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};

use signalforge_core::SignalForgeError;

use crate::error::ApiError;

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError(SignalForgeError::BadRequest(e.body_text())))
}

pub(crate) fn query_params<T>(q: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    q.map(|Query(v)| v)
        .map_err(|e| ApiError(SignalForgeError::BadRequest(e.body_text())))
}
