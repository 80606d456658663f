//! Detection event routes

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{ApiError, ApiResult, AppState};
use crate::events::EventFilter;

/// `?camera_id=&start_date=&end_date=`, shared with the recordings route
#[derive(Debug, Default, Deserialize)]
pub(super) struct ListParams {
    camera_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl ListParams {
    pub(super) fn filter(&self) -> ApiResult<EventFilter> {
        EventFilter::from_params(
            self.camera_id.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )
        .map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct IdParam {
    id: Option<String>,
}

impl IdParam {
    pub(super) fn require(self, what: &str) -> ApiResult<String> {
        self.id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("{} ID required", what)))
    }
}

/// GET /api/events: an unreadable store yields an empty list
pub(super) async fn list_events(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let filter = params.filter()?;

    match state.events.list(&filter).await {
        Ok(events) => Ok(Json(serde_json::json!({ "events": events }))),
        Err(e) => {
            warn!("Event storage unavailable: {:#}", e);
            Ok(Json(serde_json::json!({
                "events": [],
                "error": format!("{:#}", e),
            })))
        }
    }
}

/// POST /api/events: replace the stored list with `{"events": [...]}`
pub(super) async fn replace_events(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let events = match body.get("events") {
        Some(Value::Array(items)) => items.clone(),
        _ => return Err(ApiError::bad_request("Body must contain an events array")),
    };

    let count = events.len();
    state.events.replace_all(events).await?;
    info!("Saved {} events", count);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /api/events?id=
pub(super) async fn delete_event(
    State(state): State<Arc<AppState>>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let id = params.require("Event")?;

    let deleted = state.events.delete(&id).await?;
    if deleted {
        info!("Deleted event {}", id);
    }
    Ok(Json(serde_json::json!({ "success": true, "deleted": deleted })))
}

/// GET /api/events/status: database connectivity report
pub(super) async fn db_status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let env_status = state.db_env.status();
    let url = state.db_env.settings().map(|s| s.redacted_url());

    if state.db.is_none() {
        return (
            StatusCode::OK,
            Json(serde_json::json!({
                "connected": false,
                "error": "Database connection not configured",
                "details": "Set DATABASE_HOST, DATABASE_PORT, DATABASE_NAME, DATABASE_USER and DATABASE_PASSWORD",
                "envStatus": env_status,
                "constructedUrl": null,
            })),
        );
    }

    match state.events.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "connected": true,
                "eventsCount": count,
                "databaseUrl": url,
                "envStatus": env_status,
                "message": "Database connection successful",
            })),
        ),
        Err(e) => {
            let message = format!("{:#}", e);
            warn!("Database status check failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "connected": false,
                    "error": message,
                    "databaseUrl": url,
                    "envStatus": env_status,
                })),
            )
        }
    }
}
