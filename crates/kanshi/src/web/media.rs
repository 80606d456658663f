//! Media file routes: snapshots, event clips and recordings

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tower_http::services::ServeFile;
use tracing::debug;

use super::{ApiError, ApiResult, AppState};
use crate::media::{content_type_override, is_bare_filename, is_streamable, resolve_under};

const LONG_CACHE: &str = "public, max-age=31536000";

#[derive(Debug, Deserialize)]
pub(super) struct FileParam {
    file: Option<String>,
}

impl FileParam {
    fn require(self) -> ApiResult<String> {
        self.file
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing file parameter"))
    }
}

/// Serve `path` with `ServeFile`, which answers `Range` requests with 206/416.
/// A missing file is reported as a JSON 404 like every other route.
async fn send_file(path: &Path, req: Request, cache_control: &'static str) -> ApiResult<Response> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ApiError::not_found("File not found")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("File not found: {:?}", path);
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to stat {:?}", path))
                .into())
        }
    }

    let mut resp = ServeFile::new(path)
        .try_call(req)
        .await
        .with_context(|| format!("Failed to serve {:?}", path))?
        .map(Body::new);

    if resp.status().is_success() {
        let headers = resp.headers_mut();
        if let Some(mime) = content_type_override(path) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
        }
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    }
    Ok(resp)
}

/// GET /api/recordings/media?file=: snapshot or clip from the events directory
pub(super) async fn serve_media(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FileParam>, QueryRejection>,
    req: Request,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let filename = params
        .file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Filename required"))?;
    if !is_bare_filename(&filename) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    send_file(&state.paths.events_dir.join(&filename), req, LONG_CACHE).await
}

/// GET /api/events/stream?file=: seekable event clip
pub(super) async fn stream_event_clip(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FileParam>, QueryRejection>,
    req: Request,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let file = params.require()?;
    let path = resolve_under(&state.paths.events_dir, &file)
        .ok_or_else(|| ApiError::bad_request("Invalid file parameter"))?;
    send_file(&path, req, "no-cache").await
}

/// GET /api/recordings/stream?file=: MP4 or MPEG-TS recording
pub(super) async fn stream_recording(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FileParam>, QueryRejection>,
    req: Request,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let file = params.require()?;
    let path = resolve_under(&state.paths.recordings_dir, &file)
        .ok_or_else(|| ApiError::bad_request("Invalid file parameter"))?;
    if !is_streamable(&path) {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Only .mp4 and .ts recordings can be streamed",
        ));
    }
    send_file(&path, req, "no-cache").await
}
