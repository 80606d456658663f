//! Config source backed by a running dashboard's `/api/camera-config` route

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{ConfigSnapshot, ConfigSource};
use crate::camera::{CameraConfig, DEFAULT_WEBRTC_SERVER_URL};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    cameras: Vec<CameraConfig>,
    #[serde(default)]
    available_detection_objects: Vec<String>,
    #[serde(default)]
    webrtc_server_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for a dashboard server's config route
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteConfig {
    /// `base_url` is the dashboard root, e.g. `http://localhost:3000`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/camera-config", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait::async_trait]
impl ConfigSource for RemoteConfig {
    async fn load(&self) -> Result<ConfigSnapshot> {
        let resp: LoadResponse = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?
            .json()
            .await
            .context("Invalid config response")?;

        if !resp.success {
            anyhow::bail!(
                "Config route reported failure: {}",
                resp.error.unwrap_or_else(|| "unknown error".into())
            );
        }

        Ok(ConfigSnapshot {
            cameras: resp.cameras,
            available_detection_objects: resp.available_detection_objects,
            webrtc_server_url: resp
                .webrtc_server_url
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_WEBRTC_SERVER_URL.to_string()),
        })
    }

    async fn save_cameras(&self, cameras: &[CameraConfig]) -> Result<()> {
        let resp: SaveResponse = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "cameras": cameras }))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?
            .json()
            .await
            .context("Invalid save response")?;

        if !resp.success {
            anyhow::bail!(
                "Config route rejected save: {}",
                resp.error.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(())
    }
}
