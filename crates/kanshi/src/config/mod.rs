//! Camera configuration persistence
//!
//! Configuration is loaded from the most authoritative source available and
//! written back to every sink that will take it:
//! - **Primary**: the dashboard's JSON config file, either directly
//!   ([`ConfigFile`]) or through its HTTP route ([`RemoteConfig`])
//! - **Local**: a key-value copy kept next to the client ([`LocalStore`])
//! - **Defaults**: the configuration bundled with the application
//!
//! [`ConfigReconciler`] walks that chain and never fails.

pub mod file;
pub mod local;
pub mod migrate;
pub mod reconcile;
pub mod remote;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraConfig, SystemConfig, DEFAULT_WEBRTC_SERVER_URL};

/// The part of the configuration the dashboard works with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub cameras: Vec<CameraConfig>,
    pub available_detection_objects: Vec<String>,
    pub webrtc_server_url: String,
}

impl ConfigSnapshot {
    /// No cameras, no vocabulary, default media server
    pub fn empty() -> Self {
        Self {
            cameras: Vec::new(),
            available_detection_objects: Vec::new(),
            webrtc_server_url: DEFAULT_WEBRTC_SERVER_URL.to_string(),
        }
    }
}

impl From<SystemConfig> for ConfigSnapshot {
    fn from(config: SystemConfig) -> Self {
        Self {
            cameras: config.cameras,
            available_detection_objects: config.available_detection_objects,
            webrtc_server_url: config.webrtc_server_url,
        }
    }
}

/// An authoritative configuration store
#[async_trait::async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load the current configuration
    async fn load(&self) -> Result<ConfigSnapshot>;

    /// Replace the whole camera list, leaving every other setting alone
    async fn save_cameras(&self, cameras: &[CameraConfig]) -> Result<()>;
}

pub use file::ConfigFile;
pub use local::{FileLocalStore, LocalStore, MemoryLocalStore};
pub use reconcile::{ConfigOrigin, ConfigReconciler, SaveOutcome, LOCAL_CONFIG_KEY};
pub use remote::RemoteConfig;
