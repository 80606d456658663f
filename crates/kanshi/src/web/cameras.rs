//! Camera routes, proxied to the go2rtc stream registry

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{ApiError, ApiResult, AppState};
use crate::go2rtc::StreamInfo;

/// A go2rtc stream as the dashboard sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StreamCamera {
    id: String,
    name: String,
    stream_url: String,
    rtsp_url: String,
    enabled: bool,
    zones: Vec<Value>,
}

impl StreamCamera {
    fn new(name: &str, rtsp_url: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            stream_url: name.to_string(),
            rtsp_url: rtsp_url.to_string(),
            enabled: true,
            zones: Vec::new(),
        }
    }

    fn from_stream(name: &str, info: &StreamInfo) -> Self {
        Self::new(name, info.source_url().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateRequest {
    name: Option<String>,
    rtsp_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateRequest {
    rtsp_url: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// GET /api/cameras
pub(super) async fn list_cameras(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let streams = state.go2rtc.list_streams().await?;
    let cameras: Vec<StreamCamera> = streams
        .iter()
        .map(|(name, info)| StreamCamera::from_stream(name, info))
        .collect();
    Ok(Json(serde_json::json!({ "success": true, "cameras": cameras })))
}

/// POST /api/cameras: register a stream. Creating a name that already
/// exists succeeds and returns the existing stream.
pub(super) async fn create_camera(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let (Some(name), Some(rtsp_url)) = (required(request.name), required(request.rtsp_url)) else {
        return Err(ApiError::bad_request("Name and RTSP URL are required"));
    };

    match state.go2rtc.list_streams().await {
        Ok(streams) => {
            if let Some(info) = streams.get(&name) {
                info!(camera = %name, "Stream already exists in go2rtc");
                let camera = StreamCamera::new(&name, info.source_url().unwrap_or(&rtsp_url));
                return Ok(Json(serde_json::json!({
                    "success": true,
                    "camera": camera,
                    "message": "Stream already exists",
                })));
            }
        }
        Err(e) => warn!(camera = %name, "Could not check existing streams: {}", e),
    }

    state.go2rtc.add_stream(&name, &rtsp_url).await?;
    info!(camera = %name, "Registered stream with go2rtc");

    Ok(Json(serde_json::json!({
        "success": true,
        "camera": StreamCamera::new(&name, &rtsp_url),
    })))
}

/// PATCH /api/cameras/{id}: point the stream at a new source
pub(super) async fn update_camera(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let rtsp_url =
        required(request.rtsp_url).ok_or_else(|| ApiError::bad_request("RTSP URL is required"))?;

    state.go2rtc.update_stream(&id, &rtsp_url).await?;
    info!(camera = %id, "Updated stream source");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /api/cameras/{id}
pub(super) async fn delete_camera(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.go2rtc.delete_stream(&id).await?;
    info!(camera = %id, "Deleted stream from go2rtc");
    Ok(Json(serde_json::json!({ "success": true })))
}
