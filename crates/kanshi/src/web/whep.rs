//! WHEP signaling proxy
//!
//! The browser posts its SDP offer here; it is forwarded unchanged to
//! go2rtc and the SDP answer is relayed back.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::{error, info};

use super::{ApiError, ApiResult, AppState};
use crate::go2rtc::Go2rtcError;

const CORS_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

fn whep_error(name: &str, e: Go2rtcError) -> ApiError {
    match e {
        Go2rtcError::Timeout { url, timeout } => ApiError::new(
            StatusCode::GATEWAY_TIMEOUT,
            format!(
                "Connection timeout: go2rtc server at {} did not respond within {} seconds. \
                 Please verify go2rtc is running.",
                url,
                timeout.as_secs()
            ),
        ),
        Go2rtcError::Unreachable { url, source } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            format!(
                "Cannot connect to go2rtc at {}. Please verify: go2rtc is running, \
                 GO2RTC_API_URL is correct, and stream \"{}\" exists in go2rtc. Error: {}",
                url, name, source
            ),
        ),
        Go2rtcError::Status { status, .. } if status == StatusCode::NOT_FOUND => ApiError::not_found(
            format!(
                "Stream \"{}\" not found in go2rtc. Please add the camera first or verify the stream name is correct.",
                name
            ),
        ),
        Go2rtcError::Status { status, body } => {
            let body = if body.is_empty() { "Unknown error".to_string() } else { body };
            ApiError::new(status, format!("go2rtc error ({}): {}", status.as_u16(), body))
        }
        e @ Go2rtcError::Decode(_) => ApiError::internal(e.to_string()),
    }
}

/// POST /api/whep/{name}
pub(super) async fn offer(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    offer: Bytes,
) -> ApiResult<Response> {
    info!(stream = %name, "WHEP request");

    let answer = state
        .go2rtc
        .whep(&name, offer, state.whep_timeout)
        .await
        .map_err(|e| {
            error!(stream = %name, "WHEP exchange failed: {}", e);
            whep_error(&name, e)
        })?;

    info!(stream = %name, "WHEP connection established");
    Ok((
        StatusCode::CREATED,
        CORS_HEADERS,
        [(header::CONTENT_TYPE, "application/sdp")],
        answer,
    )
        .into_response())
}

/// OPTIONS /api/whep/{name}
pub(super) async fn preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, CORS_HEADERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        let timeout = whep_error(
            "cam1",
            Go2rtcError::Timeout {
                url: "http://go2rtc:1984".into(),
                timeout: Duration::from_secs(10),
            },
        );
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.message.contains("within 10 seconds"));

        let missing = whep_error(
            "cam1",
            Go2rtcError::Status {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            },
        );
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert!(missing.message.contains("\"cam1\" not found"));

        let other = whep_error(
            "cam1",
            Go2rtcError::Status {
                status: StatusCode::BAD_REQUEST,
                body: String::new(),
            },
        );
        assert_eq!(other.status, StatusCode::BAD_REQUEST);
        assert_eq!(other.message, "go2rtc error (400): Unknown error");
    }
}
