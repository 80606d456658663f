//! Recording routes: stored rows and the recordings directory scan

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use serde_json::Value;
use tracing::{info, warn};

use super::events::{IdParam, ListParams};
use super::{ApiError, ApiResult, AppState};
use crate::events::DetectionEvent;
use crate::recordings::scan_recordings;

/// GET /api/recordings
pub(super) async fn list_recordings(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let filter = params.filter()?;

    match state.recordings.list(&filter).await {
        Ok(recordings) => {
            info!("Fetched {} recordings", recordings.len());
            Ok(Json(serde_json::json!({ "recordings": recordings })))
        }
        Err(e) => {
            warn!("Recording storage unavailable: {:#}", e);
            Ok(Json(serde_json::json!({
                "recordings": [],
                "error": format!("{:#}", e),
            })))
        }
    }
}

/// POST /api/recordings: insert one event row
pub(super) async fn create_recording(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    for field in ["id", "camera_id", "ts"] {
        if body.get(field).is_none_or(Value::is_null) {
            return Err(ApiError::bad_request(format!("Missing field: {}", field)));
        }
    }
    let event: DetectionEvent = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid recording: {}", e)))?;

    let stored = state.recordings.insert(event).await?;
    info!(camera = %stored.camera_id, "Inserted recording {}", stored.id);
    Ok(Json(serde_json::json!({ "success": true, "data": stored })))
}

/// DELETE /api/recordings?id=
pub(super) async fn delete_recording(
    State(state): State<Arc<AppState>>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let id = params.require("Recording")?;

    let deleted = state.recordings.delete(&id).await?;
    Ok(Json(serde_json::json!({ "success": true, "deleted": deleted })))
}

/// GET /api/recordings/scan
pub(super) async fn scan(State(state): State<Arc<AppState>>) -> Json<Value> {
    match scan_recordings(&state.paths.recordings_dir).await {
        Ok(cameras) => Json(serde_json::json!({ "cameras": cameras })),
        Err(e) => {
            warn!("Recording scan failed: {:#}", e);
            Json(serde_json::json!({ "cameras": [], "error": format!("{:#}", e) }))
        }
    }
}
