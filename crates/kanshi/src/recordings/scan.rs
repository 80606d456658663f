//! Recording directory scan
//!
//! Layout: `<root>/<camera>/<YYYY-MM>/<YYYY-MM-DD>/<HH-MM-SS>.mp4`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingFile {
    /// Relative to the recordings root, usable with the stream route
    pub path: String,
    pub filename: String,
    pub camera_id: String,
    pub timestamp: String,
    pub date: String,
    pub time: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRecordings {
    pub camera_id: String,
    pub recordings: Vec<RecordingFile>,
}

/// `HH-MM-SS.mp4` → `HH:MM:SS`; anything else is returned unchanged
fn time_from_filename(file: &str) -> String {
    let parsed = file.strip_suffix(".mp4").and_then(|stem| {
        let parts: Vec<&str> = stem.split('-').collect();
        let valid = parts.len() == 3
            && parts
                .iter()
                .all(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit()));
        valid.then(|| parts.join(":"))
    });
    parsed.unwrap_or_else(|| file.to_string())
}

fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn subdirs(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("Failed to read {:?}", path))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    Ok(dirs)
}

fn scan_sync(root: &Path) -> Result<Vec<CameraRecordings>> {
    info!("Scanning recordings directory: {:?}", root);
    if !root.is_dir() {
        info!("Recordings directory {:?} does not exist", root);
        return Ok(Vec::new());
    }

    let mut cameras: BTreeMap<String, Vec<RecordingFile>> = BTreeMap::new();

    for (camera_id, camera_path) in subdirs(root)? {
        debug!(camera = %camera_id, "Scanning camera folder");
        for (month, month_path) in subdirs(&camera_path)? {
            for (date, date_path) in subdirs(&month_path)? {
                for entry in fs::read_dir(&date_path)? {
                    let entry = entry?;
                    let filename = entry.file_name().to_string_lossy().into_owned();
                    if !filename.ends_with(".mp4") || !entry.file_type()?.is_file() {
                        continue;
                    }
                    let size = entry.metadata()?.len();
                    let time = time_from_filename(&filename);

                    cameras.entry(camera_id.clone()).or_default().push(RecordingFile {
                        path: format!("{}/{}/{}/{}", camera_id, month, date, filename),
                        filename,
                        camera_id: camera_id.clone(),
                        timestamp: format!("{} {}", date, time),
                        date: date.clone(),
                        time,
                        size: format_size(size),
                    });
                }
            }
        }
    }

    let cameras: Vec<CameraRecordings> = cameras
        .into_iter()
        .map(|(camera_id, mut recordings)| {
            recordings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            CameraRecordings {
                camera_id,
                recordings,
            }
        })
        .collect();

    info!("Found {} cameras with recordings", cameras.len());
    Ok(cameras)
}

/// Walk `root` and group the `.mp4` files found by camera, newest first.
/// A missing root yields an empty list.
pub async fn scan_recordings(root: impl Into<PathBuf>) -> Result<Vec<CameraRecordings>> {
    let root = root.into();
    tokio::task::spawn_blocking(move || scan_sync(&root))
        .await
        .context("Recording scan task failed")?
}
