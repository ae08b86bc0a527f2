//! HTTP error envelope: `{"error": {"code", "message", "hint"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use signalforge_core::{ErrorCode, SignalForgeError};

#[derive(Debug)]
pub struct ApiError(pub SignalForgeError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<SignalForgeError> for ApiError {
    fn from(e: SignalForgeError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidSymbol | ErrorCode::InvalidInterval | ErrorCode::BadRequest => {
            StatusCode::BAD_REQUEST
        }
        ErrorCode::InsufficientData | ErrorCode::StaleData => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
        ErrorCode::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = status_for(code);
        if status.is_server_error() {
            tracing::warn!(code = code.as_str(), error = %self.0, "request failed");
        } else {
            tracing::debug!(code = code.as_str(), error = %self.0, "request rejected");
        }
        let body = json!({
            "error": {
                "code": code,
                "message": self.0.to_string(),
                "hint": self.0.hint(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(status_for(ErrorCode::InvalidInterval), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::InsufficientData), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorCode::ModelUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorCode::UpstreamTimeout), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn envelope_status() {
        let resp = ApiError(SignalForgeError::RateLimited).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
