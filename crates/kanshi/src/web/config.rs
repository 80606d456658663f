//! Camera configuration file routes

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{ApiError, ApiResult, AppState};
use crate::camera::{find_duplicate_id, CameraConfig};
use crate::config::ConfigSource;

#[derive(Debug, Deserialize)]
pub(super) struct SaveRequest {
    cameras: Option<Vec<CameraConfig>>,
}

/// GET /api/camera-config
pub(super) async fn get_config(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let snapshot = state.config_file.load().await?;

    let mut body = serde_json::to_value(&snapshot).map_err(anyhow::Error::from)?;
    body["success"] = Value::Bool(true);
    Ok(Json(body))
}

/// POST /api/camera-config: replace the camera list
pub(super) async fn save_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let cameras = request
        .cameras
        .ok_or_else(|| ApiError::bad_request("Missing cameras array"))?;

    if let Some(id) = find_duplicate_id(&cameras) {
        return Err(ApiError::bad_request(format!("Duplicate camera id: {}", id)));
    }

    state.config_file.save_cameras(&cameras).await?;
    info!(
        "Saved {} cameras to {:?}",
        cameras.len(),
        state.config_file.path()
    );
    Ok(Json(serde_json::json!({ "success": true })))
}
