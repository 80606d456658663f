//! Kanshi Server: NVR dashboard backend with web UI
//!
//! Proxies camera management to go2rtc, serves detection events and
//! recordings from JSON files or PostgreSQL, and serves the dashboard UI.
//!
//! ## Usage
//!
//! ```bash
//! # Start server (web UI on port 3000, go2rtc on localhost:1984)
//! kanshi-server
//!
//! # Custom web port and go2rtc address
//! KANSHI_WEB_PORT=8080 GO2RTC_API_URL=http://go2rtc:1984 kanshi-server
//!
//! # Events and recordings in PostgreSQL
//! DATABASE_HOST=postgres DATABASE_PORT=5432 DATABASE_NAME=nvr \
//!   DATABASE_USER=nvr DATABASE_PASSWORD=secret kanshi-server
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use kanshi::config::ConfigSource;
use kanshi::web::{AppState, Paths};
use kanshi::{DbEnv, Go2rtcClient};

/// Server configuration from environment
struct Config {
    web_port: u16,
    ui_path: Option<PathBuf>,
    go2rtc_url: String,
    paths: Paths,
    db: DbEnv,
}

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

impl Config {
    fn from_env() -> Self {
        let web_port: u16 = std::env::var("KANSHI_WEB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let ui_path = std::env::var("KANSHI_UI_PATH")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                // Auto-detect: check common locations relative to the working directory
                let candidates = ["./ui/build", "../ui/build", "./build"];
                candidates.iter().map(PathBuf::from).find(|p| p.exists())
            });

        let go2rtc_url = std::env::var("GO2RTC_API_URL")
            .unwrap_or_else(|_| kanshi::DEFAULT_WEBRTC_SERVER_URL.to_string());

        let paths = Paths {
            cameras_json: env_path("CAMERAS_JSON", "./share/cameras.json"),
            events_json: env_path("EVENTS_JSON", "./share/events.json"),
            recordings_json: env_path("RECORDINGS_JSON", "./share/recordings.json"),
            models_json: env_path("MODELS_JSON", "./share/models.json"),
            events_dir: env_path("EVENTS_DIR", "/app/share/events"),
            recordings_dir: env_path("RECORDINGS_DIR", "/app/share/recordings"),
        };

        Self {
            web_port,
            ui_path,
            go2rtc_url,
            paths,
            db: DbEnv::from_env(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env();

    info!("Kanshi Server starting");
    info!("  Web port: {}", config.web_port);
    info!("  go2rtc: {}", config.go2rtc_url);
    info!("  Camera config: {:?}", config.paths.cameras_json);
    info!("  Events dir: {:?}", config.paths.events_dir);
    info!("  Recordings dir: {:?}", config.paths.recordings_dir);
    if let Some(ref ui_path) = config.ui_path {
        info!("  UI path: {:?}", ui_path);
    }

    let go2rtc = Go2rtcClient::new(&config.go2rtc_url)?;
    let state = Arc::new(AppState::from_env_backends(go2rtc, config.paths, config.db));

    // Creates the config file when missing
    match state.config_file.load().await {
        Ok(snapshot) => info!("Loaded {} cameras", snapshot.cameras.len()),
        Err(e) => warn!("Camera config unreadable: {:#}", e),
    }

    // Graceful shutdown
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    let web_bind = SocketAddr::from(([0, 0, 0, 0], config.web_port));
    let web_ui_path = config.ui_path.clone();
    let web_cancel = cancel.clone();
    let web_state = state.clone();
    tracker.spawn(async move {
        tokio::select! {
            result = kanshi::web::start(web_state, web_bind, web_ui_path) => {
                if let Err(e) = result {
                    error!("Web server error: {:#}", e);
                }
            }
            _ = web_cancel.cancelled() => {
                info!("Web server: shutting down");
            }
        }
    });

    tracker.close();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = tracker.wait() => {
            warn!("Web server exited");
        }
    }
    cancel.cancel();

    if tokio::time::timeout(Duration::from_secs(5), tracker.wait())
        .await
        .is_err()
    {
        warn!("Shutdown timed out, forcing exit");
    }

    if let Some(pool) = state.db.as_ref() {
        pool.close().await;
    }

    info!("Server stopped");
    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kanshi=info,kanshi_server=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
