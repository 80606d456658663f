//! JSON config file backend
//!
//! The file holds `cameras`, `availableDetectionObjects` and `webrtcServerUrl`
//! at the top level. Other keys are kept untouched when cameras are saved.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{ConfigSnapshot, ConfigSource};
use crate::camera::{CameraConfig, DEFAULT_WEBRTC_SERVER_URL};

/// Config file on the local filesystem
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw document. A missing or blank file yields `None`.
    async fn read_document(&self) -> Result<Option<Map<String, Value>>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", self.path));
            }
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {:?}", self.path))?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => anyhow::bail!("Config file {:?} is not a JSON object", self.path),
        }
    }

    async fn write_document(&self, doc: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        write_file_replacing(&self.path, json.as_bytes()).await
    }
}

fn empty_document() -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert("cameras".into(), Value::Array(Vec::new()));
    doc.insert("availableDetectionObjects".into(), Value::Array(Vec::new()));
    doc.insert(
        "webrtcServerUrl".into(),
        Value::String(DEFAULT_WEBRTC_SERVER_URL.into()),
    );
    doc
}

/// Pull the snapshot fields out of a document, defaulting whatever is missing
fn snapshot_from_document(doc: &Map<String, Value>) -> Result<ConfigSnapshot> {
    let cameras = match doc.get("cameras") {
        Some(Value::Null) | None => Vec::new(),
        Some(v) => serde_json::from_value(v.clone()).context("Invalid cameras array")?,
    };
    let available_detection_objects = match doc.get("availableDetectionObjects") {
        Some(Value::Null) | None => Vec::new(),
        Some(v) => serde_json::from_value(v.clone())
            .context("Invalid availableDetectionObjects array")?,
    };
    let webrtc_server_url = doc
        .get("webrtcServerUrl")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_WEBRTC_SERVER_URL)
        .to_string();

    Ok(ConfigSnapshot {
        cameras,
        available_detection_objects,
        webrtc_server_url,
    })
}

/// Write `contents` to a fresh sibling temp file, then rename it over `path`.
/// Each write stages in its own file, so concurrent writers resolve as
/// last rename wins.
pub(crate) async fn write_file_replacing(path: &Path, contents: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let contents = contents.to_vec();
    tokio::task::spawn_blocking(move || replace_sync(&path, &contents))
        .await
        .context("File write task failed")?
}

fn replace_sync(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {:?}", parent))?;

    let mut staging = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    staging
        .write_all(contents)
        .with_context(|| format!("Failed to write {:?}", staging.path()))?;
    staging
        .persist(path)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

#[async_trait::async_trait]
impl ConfigSource for ConfigFile {
    async fn load(&self) -> Result<ConfigSnapshot> {
        match self.read_document().await? {
            Some(doc) => {
                let snapshot = snapshot_from_document(&doc)?;
                debug!(
                    "Loaded {} cameras from {:?}",
                    snapshot.cameras.len(),
                    self.path
                );
                Ok(snapshot)
            }
            None => {
                info!("Config file {:?} missing or empty, initializing", self.path);
                let doc = empty_document();
                self.write_document(&doc).await?;
                snapshot_from_document(&doc)
            }
        }
    }

    async fn save_cameras(&self, cameras: &[CameraConfig]) -> Result<()> {
        let mut doc = self.read_document().await?.unwrap_or_else(empty_document);
        doc.insert("cameras".into(), serde_json::to_value(cameras)?);
        self.write_document(&doc).await?;
        info!("Saved {} cameras to {:?}", cameras.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::default_cameras;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("share").join("cameras.json");
        let file = ConfigFile::new(&path);

        let snapshot = file.load().await.unwrap();
        assert!(snapshot.cameras.is_empty());
        assert_eq!(snapshot.webrtc_server_url, DEFAULT_WEBRTC_SERVER_URL);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn blank_file_is_reinitialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cameras.json");
        std::fs::write(&path, "   \n").unwrap();

        let snapshot = ConfigFile::new(&path).load().await.unwrap();
        assert!(snapshot.cameras.is_empty());
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["webrtcServerUrl"], DEFAULT_WEBRTC_SERVER_URL);
    }

    #[tokio::test]
    async fn save_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cameras.json");
        std::fs::write(
            &path,
            r#"{"cameras": [], "availableDetectionObjects": ["person"], "webrtcServerUrl": "http://nvr:1984", "storage": {"retentionDays": 3}}"#,
        )
        .unwrap();
        let file = ConfigFile::new(&path);

        let cams = default_cameras();
        file.save_cameras(&cams[..2]).await.unwrap();

        let snapshot = file.load().await.unwrap();
        assert_eq!(snapshot.cameras, cams[..2]);
        assert_eq!(snapshot.available_detection_objects, ["person"]);
        assert_eq!(snapshot.webrtc_server_url, "http://nvr:1984");

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["storage"]["retentionDays"], 3);
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cameras.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(ConfigFile::new(&path).load().await.is_err());
    }
}
