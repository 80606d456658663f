//! go2rtc health check, models file and server status

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::Value;
use tracing::{debug, warn};

use super::{AppState, HEALTH_TIMEOUT};

/// GET /api/go2rtc/health
pub(super) async fn go2rtc_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let url = state.go2rtc.base_url();
    debug!("Checking go2rtc health at {}", url);

    match state.go2rtc.list_streams_within(Some(HEALTH_TIMEOUT)).await {
        Ok(streams) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "message": "go2rtc is reachable",
                "url": url,
                "streamCount": streams.len(),
                "streams": streams.keys().collect::<Vec<_>>(),
            })),
        ),
        Err(e) => {
            warn!("go2rtc health check failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                    "url": url,
                    "suggestion": "Verify that go2rtc is running and GO2RTC_API_URL is correct",
                })),
            )
        }
    }
}

/// GET /api/models: the models file, verbatim
pub(super) async fn models(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let path = &state.paths.models_json;
    let parsed = match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str::<Value>(&content).map_err(anyhow::Error::from),
        Err(e) => Err(anyhow::Error::from(e)),
    };
    match parsed {
        Ok(doc) => (StatusCode::OK, Json(doc)),
        Err(e) => {
            warn!("Error reading {:?}: {}", path, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "models": [] })),
            )
        }
    }
}

/// GET /api/status: server status
pub(super) async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "go2rtc_url": state.go2rtc.base_url(),
        "database": state.db.is_some(),
        "config_file": state.paths.cameras_json,
    }))
}
