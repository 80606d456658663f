//! Kanshi Client
//!
//! Edits the camera configuration of a running dashboard. The configuration
//! is loaded from the dashboard, falling back to a local copy and then to the
//! bundled defaults, and every change is written to both.
//!
//! ## Usage
//!
//! ```bash
//! # Dashboard address (default http://localhost:3000)
//! export KANSHI_SERVER_URL=http://nvr.local:3000
//!
//! kanshi-client list
//! kanshi-client add porch rtsp://10.0.0.5:554/live
//! kanshi-client disable cam2
//! kanshi-client remove porch
//! kanshi-client fence cam1 add "Entry Zone" 0.1,0.1 0.9,0.1 0.9,0.9 0.1,0.9
//! kanshi-client fence cam1 move 0 2 0.95,0.85
//! kanshi-client streams
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use kanshi::config::{ConfigSource, FileLocalStore, RemoteConfig};
use kanshi::{
    CameraConfig, ConfigOrigin, ConfigReconciler, FenceEditor, FencePoint, Go2rtcClient,
    SaveOutcome,
};

/// Client configuration from environment/args
struct Config {
    server_url: String,
    local_dir: PathBuf,
    command: Vec<String>,
}

impl Config {
    fn from_env() -> Self {
        let server_url = std::env::var("KANSHI_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let local_dir = std::env::var("KANSHI_LOCAL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.kanshi"));

        let command = std::env::args().skip(1).collect();

        Self {
            server_url,
            local_dir,
            command,
        }
    }
}

const USAGE: &str = "usage: kanshi-client <command>

commands:
  list                                  show configured cameras
  add <name> <rtsp-url>                 register a stream and add a camera
  enable <id> | disable <id>            toggle a camera
  remove <id>                           remove a camera and its stream
  streams                               list go2rtc streams and MP4 URLs
  fence <id> list                       show a camera's virtual fences
  fence <id> add <name> <x,y>...        add a fence polygon
  fence <id> move <fence> <point> <x,y> move one polygon point
  fence <id> drop <fence> <point>       delete one polygon point
  fence <id> remove <fence>             delete a fence
  fence <id> enable|disable <fence>     toggle a fence
  fence <id> check <class> <x,y>        which fences a detection would trigger";

fn parse_point(s: &str) -> Result<FencePoint> {
    let (x, y) = s
        .split_once(',')
        .with_context(|| format!("Expected x,y but got {:?}", s))?;
    Ok(FencePoint::new(
        x.trim().parse().with_context(|| format!("Invalid x in {:?}", s))?,
        y.trim().parse().with_context(|| format!("Invalid y in {:?}", s))?,
    ))
}

fn parse_index(s: &str) -> Result<usize> {
    s.parse().with_context(|| format!("Invalid index {:?}", s))
}

fn report(outcome: SaveOutcome) {
    if !outcome.persisted() {
        println!("WARNING: change kept in memory only, nothing was persisted");
    } else if outcome.primary {
        println!("Saved");
    } else {
        println!("Dashboard unreachable, saved local copy only");
    }
}

fn print_camera(cam: &CameraConfig) {
    println!(
        "{:<12} {:<20} {:<16} {:<8} stream={} fences={}",
        cam.id,
        cam.name,
        cam.location,
        if cam.enabled { "enabled" } else { "disabled" },
        cam.stream_url,
        cam.fences().len()
    );
}

async fn set_enabled(config: &ConfigReconciler, id: &str, enabled: bool) -> Result<()> {
    let outcome = config
        .edit_camera(id, |cam| cam.enabled = enabled)
        .await
        .with_context(|| format!("No camera with id {:?}", id))?;
    report(outcome);
    Ok(())
}

async fn run_fence(config: &ConfigReconciler, args: &[String]) -> Result<()> {
    let [id, action, rest @ ..] = args else {
        bail!("{}", USAGE);
    };
    let camera = config
        .cameras()
        .await
        .into_iter()
        .find(|c| &c.id == id)
        .with_context(|| format!("No camera with id {:?}", id))?;
    let mut editor = FenceEditor::new(&camera);

    match (action.as_str(), rest) {
        ("list", []) => {
            for (i, fence) in editor.fences().iter().enumerate() {
                let points: Vec<String> = fence
                    .points
                    .iter()
                    .map(|p| format!("{:.3},{:.3}", p.x, p.y))
                    .collect();
                println!(
                    "{} {:<16} {:<8} objects={} points={}",
                    i,
                    fence.name,
                    if fence.enabled { "enabled" } else { "disabled" },
                    fence.detect_objects.join(","),
                    points.join(" ")
                );
            }
            return Ok(());
        }
        ("check", [class_name, at]) => {
            let at = parse_point(at)?;
            let hits: Vec<&str> = editor
                .fences()
                .iter()
                .filter(|f| f.triggers(class_name, at))
                .map(|f| f.name.as_str())
                .collect();
            if hits.is_empty() {
                println!("{} at {:.3},{:.3}: outside every active fence", class_name, at.x, at.y);
            } else {
                println!("{} at {:.3},{:.3}: {}", class_name, at.x, at.y, hits.join(", "));
            }
            return Ok(());
        }
        ("add", [name, points @ ..]) => {
            editor.add_fence(name, camera.detect_objects.clone());
            for p in points {
                editor.add_point(parse_point(p)?)?;
            }
            if points.len() < 3 {
                warn!("Fence {:?} has fewer than 3 points", name);
            }
        }
        ("move", [fence, point, to]) => {
            editor.begin_edit(parse_index(fence)?)?;
            editor.drag_point(parse_index(point)?, parse_point(to)?)?;
        }
        ("drop", [fence, point]) => {
            editor.begin_edit(parse_index(fence)?)?;
            let removed = editor.remove_point(parse_index(point)?)?;
            info!("Removing point {:.3},{:.3}", removed.x, removed.y);
        }
        ("remove", [fence]) => {
            let removed = editor.remove_fence(parse_index(fence)?)?;
            info!("Removing fence {:?}", removed.name);
        }
        ("enable", [fence]) => editor.set_enabled(parse_index(fence)?, true)?,
        ("disable", [fence]) => editor.set_enabled(parse_index(fence)?, false)?,
        _ => bail!("{}", USAGE),
    }

    report(editor.commit(config).await?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kanshi=warn,kanshi_client=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::from_env();
    if cfg.command.is_empty() {
        bail!("{}", USAGE);
    }

    let remote: Arc<dyn ConfigSource> = Arc::new(RemoteConfig::new(&cfg.server_url)?);
    let local = Arc::new(FileLocalStore::new(&cfg.local_dir));
    let config = ConfigReconciler::new(Some(remote), local);

    let (snapshot, origin) = config.load().await;
    match origin {
        ConfigOrigin::Primary => info!("Loaded configuration from {}", cfg.server_url),
        ConfigOrigin::Local => warn!("Dashboard unreachable, using local copy"),
        ConfigOrigin::Defaults => warn!("No configuration found, using defaults"),
    }
    let go2rtc = Go2rtcClient::new(&snapshot.webrtc_server_url)?;

    let args: Vec<&str> = cfg.command.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["list"] => {
            for cam in &snapshot.cameras {
                print_camera(cam);
            }
        }
        ["add", name, rtsp_url] => {
            if snapshot.cameras.iter().any(|c| c.id == *name) {
                bail!("Camera {:?} already exists", name);
            }
            if let Err(e) = go2rtc.add_stream(name, rtsp_url).await {
                warn!("Failed to register stream with go2rtc: {}", e);
            }
            let mut cameras = snapshot.cameras.clone();
            let mut camera = CameraConfig::from_stream(name, Some(rtsp_url.to_string()));
            camera.detect_objects = vec!["person".to_string()];
            cameras.push(camera);
            report(config.update_cameras(cameras).await);
        }
        ["enable", id] => set_enabled(&config, id, true).await?,
        ["disable", id] => set_enabled(&config, id, false).await?,
        ["remove", id] => {
            let (removed, outcome) = config
                .remove_camera(id)
                .await
                .with_context(|| format!("No camera with id {:?}", id))?;
            // Stream deletion is best-effort; the camera is already gone
            if let Err(e) = go2rtc.delete_stream(&removed.stream_url).await {
                warn!("Failed to delete go2rtc stream {:?}: {}", removed.stream_url, e);
            }
            report(outcome);
        }
        ["streams"] => {
            let streams = go2rtc.list_streams().await?;
            for (name, info) in &streams {
                println!(
                    "{:<16} {:<40} {}",
                    name,
                    info.source_url().unwrap_or("-"),
                    go2rtc.stream_mp4_url(name)?
                );
            }
            println!("{} streams at {}", streams.len(), go2rtc.base_url());
        }
        ["fence", ..] => run_fence(&config, &cfg.command[1..]).await?,
        _ => bail!("{}", USAGE),
    }

    Ok(())
}
