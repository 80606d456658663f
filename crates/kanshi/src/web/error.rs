//! Route error type
//!
//! Every handler returns `Result<_, ApiError>`. The error is logged here and
//! rendered as `{"success": false, "error": "..."}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::{error, warn};

use crate::go2rtc::Go2rtcError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", e))
    }
}

/// Camera proxy routes report every go2rtc failure as a 500
impl From<Go2rtcError> for ApiError {
    fn from(e: Go2rtcError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::new(e.status(), e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::bad_request(e.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go2rtc_status_text_is_embedded() {
        let err = ApiError::from(Go2rtcError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "bad src".into(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "go2rtc API error: 400 - bad src");
    }

    #[test]
    fn anyhow_chain_is_flattened() {
        let err: ApiError = anyhow::anyhow!("disk full").context("Failed to write").into();
        assert_eq!(err.message, "Failed to write: disk full");
    }
}
