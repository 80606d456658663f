//! Web server module: axum HTTP API for the dashboard.
//!
//! Serves the dashboard UI as static files and provides:
//! - `GET|POST /api/camera-config`: camera configuration file
//! - `GET|POST /api/cameras`, `PATCH|DELETE /api/cameras/{id}`: go2rtc streams
//! - `GET|POST|DELETE /api/events`, `GET /api/events/status`: detection events
//! - `GET|POST|DELETE /api/recordings`, `GET /api/recordings/scan`: recordings
//! - `GET /api/recordings/media`, `/api/events/stream`, `/api/recordings/stream`: media files
//! - `POST /api/whep/{name}`: WHEP offer/answer proxied to go2rtc
//! - `GET /api/go2rtc/health`, `/api/models`, `/api/status`

pub mod error;

mod cameras;
mod config;
mod events;
mod health;
mod media;
mod recordings;
mod whep;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::routing::{get, patch, post};
use axum::Router;
use sqlx::postgres::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::db::DbEnv;
use crate::events::{EventStore, JsonEventStore, PgEventStore};
use crate::go2rtc::Go2rtcClient;
use crate::recordings::{JsonRecordingStore, PgRecordingStore, RecordingStore};

pub use error::{ApiError, ApiResult};

/// How long a WHEP exchange may take before the route answers 504
pub const WHEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for the go2rtc health check
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Filesystem locations the routes read and write
#[derive(Debug, Clone)]
pub struct Paths {
    pub cameras_json: PathBuf,
    pub events_json: PathBuf,
    pub recordings_json: PathBuf,
    pub models_json: PathBuf,
    pub events_dir: PathBuf,
    pub recordings_dir: PathBuf,
}

/// Shared state for the web server
pub struct AppState {
    pub config_file: ConfigFile,
    pub go2rtc: Go2rtcClient,
    pub events: Arc<dyn EventStore>,
    pub recordings: Arc<dyn RecordingStore>,
    /// Present when events and recordings live in PostgreSQL
    pub db: Option<PgPool>,
    pub db_env: DbEnv,
    pub paths: Paths,
    pub whep_timeout: Duration,
    pub start_time: Instant,
}

impl AppState {
    /// State backed by JSON files only
    pub fn with_json_files(go2rtc: Go2rtcClient, paths: Paths) -> Self {
        Self {
            config_file: ConfigFile::new(&paths.cameras_json),
            go2rtc,
            events: Arc::new(JsonEventStore::new(&paths.events_json)),
            recordings: Arc::new(JsonRecordingStore::new(&paths.recordings_json)),
            db: None,
            db_env: DbEnv::default(),
            paths,
            whep_timeout: WHEP_TIMEOUT,
            start_time: Instant::now(),
        }
    }

    /// Use PostgreSQL for events and recordings when `db_env` is complete,
    /// otherwise the JSON files
    pub fn from_env_backends(go2rtc: Go2rtcClient, paths: Paths, db_env: DbEnv) -> Self {
        let mut state = Self::with_json_files(go2rtc, paths);
        match db_env.settings() {
            Some(settings) => {
                info!("Using PostgreSQL at {}", settings.redacted_url());
                let pool = settings.pool();
                state.events = Arc::new(PgEventStore::new(pool.clone()));
                state.recordings = Arc::new(PgRecordingStore::new(pool.clone()));
                state.db = Some(pool);
            }
            None => {
                info!(
                    "Database not configured, using {:?} and {:?}",
                    state.paths.events_json, state.paths.recordings_json
                );
            }
        }
        state.db_env = db_env;
        state
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/camera-config",
            get(config::get_config).post(config::save_config),
        )
        .route(
            "/api/cameras",
            get(cameras::list_cameras).post(cameras::create_camera),
        )
        .route(
            "/api/cameras/{id}",
            patch(cameras::update_camera).delete(cameras::delete_camera),
        )
        .route(
            "/api/events",
            get(events::list_events)
                .post(events::replace_events)
                .delete(events::delete_event),
        )
        .route("/api/events/status", get(events::db_status))
        .route("/api/events/stream", get(media::stream_event_clip))
        .route(
            "/api/recordings",
            get(recordings::list_recordings)
                .post(recordings::create_recording)
                .delete(recordings::delete_recording),
        )
        .route("/api/recordings/scan", get(recordings::scan))
        .route("/api/recordings/media", get(media::serve_media))
        .route("/api/recordings/stream", get(media::stream_recording))
        .route(
            "/api/whep/{name}",
            post(whep::offer).options(whep::preflight),
        )
        .route("/api/go2rtc/health", get(health::go2rtc_health))
        .route("/api/models", get(health::models))
        .route("/api/status", get(health::status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server.
///
/// `ui_path`: directory containing the dashboard build output.
/// If None, only the API is served.
pub async fn start(state: Arc<AppState>, bind: SocketAddr, ui_path: Option<PathBuf>) -> Result<()> {
    let mut app = router(state);

    if let Some(ref path) = ui_path {
        if path.exists() {
            info!("Serving UI from {:?}", path);
            app = app.fallback_service(
                ServeDir::new(path)
                    .fallback(ServeDir::new(path).append_index_html_on_directories(true)),
            );
        } else {
            warn!("UI path {:?} does not exist, skipping static file serving", path);
        }
    }

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind to {}", bind))?;

    info!("Web server listening on http://{}", bind);

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}
