//! Load-with-fallback and save-with-fallback for the camera configuration

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::migrate::migrate_stored;
use super::{ConfigSnapshot, ConfigSource, LocalStore};
use crate::camera::{find_duplicate_id, CameraConfig, SystemConfig};

/// Key the local backup copy lives under
pub const LOCAL_CONFIG_KEY: &str = "frigate_camera_config";

/// Where the last loaded configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Primary,
    Local,
    Defaults,
}

/// Which sinks accepted a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOutcome {
    pub primary: bool,
    pub local: bool,
}

impl SaveOutcome {
    pub fn persisted(&self) -> bool {
        self.primary || self.local
    }
}

/// Holds the working configuration and keeps it in step with its stores.
///
/// Loading never fails: every source error is logged and the next source is
/// tried, ending at the bundled defaults. Saving updates the in-memory copy
/// before touching any store.
pub struct ConfigReconciler {
    primary: Option<Arc<dyn ConfigSource>>,
    local: Arc<dyn LocalStore>,
    defaults: ConfigSnapshot,
    state: RwLock<ConfigSnapshot>,
}

impl ConfigReconciler {
    pub fn new(primary: Option<Arc<dyn ConfigSource>>, local: Arc<dyn LocalStore>) -> Self {
        Self::with_defaults(primary, local, SystemConfig::default().into())
    }

    pub fn with_defaults(
        primary: Option<Arc<dyn ConfigSource>>,
        local: Arc<dyn LocalStore>,
        defaults: ConfigSnapshot,
    ) -> Self {
        Self {
            primary,
            local,
            defaults,
            state: RwLock::new(ConfigSnapshot::empty()),
        }
    }

    /// Current in-memory configuration
    pub async fn snapshot(&self) -> ConfigSnapshot {
        self.state.read().await.clone()
    }

    pub async fn cameras(&self) -> Vec<CameraConfig> {
        self.state.read().await.cameras.clone()
    }

    /// Load from primary, then local copy, then defaults
    pub async fn load(&self) -> (ConfigSnapshot, ConfigOrigin) {
        let (snapshot, origin) = match self.load_primary().await {
            Some(snapshot) => (snapshot, ConfigOrigin::Primary),
            None => match self.load_local().await {
                Some(snapshot) => (snapshot, ConfigOrigin::Local),
                None => {
                    info!("Using bundled default camera config");
                    (self.defaults.clone(), ConfigOrigin::Defaults)
                }
            },
        };

        *self.state.write().await = snapshot.clone();
        (snapshot, origin)
    }

    async fn load_primary(&self) -> Option<ConfigSnapshot> {
        let primary = self.primary.as_ref()?;
        match primary.load().await {
            Ok(mut snapshot) => {
                if snapshot.available_detection_objects.is_empty() {
                    snapshot.available_detection_objects =
                        self.defaults.available_detection_objects.clone();
                }
                info!("Loaded {} cameras from primary config", snapshot.cameras.len());
                Some(snapshot)
            }
            Err(e) => {
                warn!("Primary config unavailable, trying local copy: {:#}", e);
                None
            }
        }
    }

    async fn load_local(&self) -> Option<ConfigSnapshot> {
        let raw = match self.local.get(LOCAL_CONFIG_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read local config copy: {:#}", e);
                return None;
            }
        };

        let migrated = match migrate_stored(&raw, &self.defaults.available_detection_objects) {
            Ok(m) => m,
            Err(e) => {
                warn!("Discarding unreadable local config copy: {:#}", e);
                return None;
            }
        };

        info!(
            "Loaded {} cameras from local config copy",
            migrated.snapshot.cameras.len()
        );
        if migrated.changed {
            match self.write_local(&migrated.snapshot).await {
                Ok(()) => info!("Saved migrated config to local copy"),
                Err(e) => warn!("Failed to save migrated config: {:#}", e),
            }
        }
        Some(migrated.snapshot)
    }

    async fn write_local(&self, snapshot: &ConfigSnapshot) -> anyhow::Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.local.set(LOCAL_CONFIG_KEY, &json).await
    }

    /// Replace the whole camera list.
    ///
    /// The in-memory list changes immediately. The primary store is written
    /// first, then the local copy, which is written whether or not the
    /// primary accepted the list.
    pub async fn update_cameras(&self, cameras: Vec<CameraConfig>) -> SaveOutcome {
        if let Some(id) = find_duplicate_id(&cameras) {
            warn!(camera = %id, "Saving camera list with duplicate id");
        }

        let snapshot = {
            let mut state = self.state.write().await;
            state.cameras = cameras;
            state.clone()
        };

        let mut outcome = SaveOutcome::default();

        if let Some(primary) = &self.primary {
            match primary.save_cameras(&snapshot.cameras).await {
                Ok(()) => {
                    debug!("Saved cameras to primary config");
                    outcome.primary = true;
                }
                Err(e) => warn!("Primary config save failed, keeping local copy only: {:#}", e),
            }
        }

        match self.write_local(&snapshot).await {
            Ok(()) => outcome.local = true,
            Err(e) => warn!("Failed to save local config copy: {:#}", e),
        }

        outcome
    }

    /// Apply `edit` to one camera and save the whole list.
    ///
    /// Returns `None` when no camera has that id.
    pub async fn edit_camera<F>(&self, id: &str, edit: F) -> Option<SaveOutcome>
    where
        F: FnOnce(&mut CameraConfig),
    {
        let mut cameras = self.cameras().await;
        let cam = cameras.iter_mut().find(|c| c.id == id)?;
        edit(cam);
        Some(self.update_cameras(cameras).await)
    }

    /// Drop one camera from the list and save. Returns the removed camera.
    pub async fn remove_camera(&self, id: &str) -> Option<(CameraConfig, SaveOutcome)> {
        let mut cameras = self.cameras().await;
        let index = cameras.iter().position(|c| c.id == id)?;
        let removed = cameras.remove(index);
        let outcome = self.update_cameras(cameras).await;
        Some((removed, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{default_cameras, DEFAULT_WEBRTC_SERVER_URL};
    use crate::config::{ConfigFile, MemoryLocalStore};
    use anyhow::Result;
    use tempfile::tempdir;

    /// Primary that always fails
    struct Unreachable;

    #[async_trait::async_trait]
    impl ConfigSource for Unreachable {
        async fn load(&self) -> Result<ConfigSnapshot> {
            anyhow::bail!("connection refused")
        }

        async fn save_cameras(&self, _cameras: &[CameraConfig]) -> Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    /// Local store that rejects every write
    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl LocalStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    fn failing() -> Option<Arc<dyn ConfigSource>> {
        Some(Arc::new(Unreachable))
    }

    #[tokio::test]
    async fn falls_back_to_defaults_when_everything_is_empty() {
        let local = Arc::new(MemoryLocalStore::new());
        let reconciler = ConfigReconciler::new(failing(), local);

        let (snapshot, origin) = reconciler.load().await;
        assert_eq!(origin, ConfigOrigin::Defaults);
        assert_eq!(snapshot.cameras, default_cameras());
        assert_eq!(reconciler.cameras().await, default_cameras());
    }

    #[tokio::test]
    async fn local_copy_is_migrated_and_written_back() {
        let local = Arc::new(MemoryLocalStore::new());
        let stored = serde_json::json!({
            "cameras": [{"id": "x", "name": "X", "streamUrl": "rtsp://host:8554/camX"}],
            "availableDetectionObjects": ["person"],
            "webrtcServerUrl": "http://127.0.0.1:8556",
        });
        local
            .set(LOCAL_CONFIG_KEY, &stored.to_string())
            .await
            .unwrap();

        let reconciler = ConfigReconciler::new(failing(), local.clone());
        let (snapshot, origin) = reconciler.load().await;

        assert_eq!(origin, ConfigOrigin::Local);
        assert_eq!(snapshot.cameras[0].stream_url, "camX");
        assert_eq!(snapshot.webrtc_server_url, DEFAULT_WEBRTC_SERVER_URL);

        let persisted: serde_json::Value =
            serde_json::from_str(&local.get(LOCAL_CONFIG_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(persisted["cameras"][0]["streamUrl"], "camX");
        assert_eq!(persisted["webrtcServerUrl"], DEFAULT_WEBRTC_SERVER_URL);
    }

    #[tokio::test]
    async fn corrupt_local_copy_falls_through_to_defaults() {
        let local = Arc::new(MemoryLocalStore::new());
        local.set(LOCAL_CONFIG_KEY, "{{{").await.unwrap();

        let reconciler = ConfigReconciler::new(None, local);
        let (_, origin) = reconciler.load().await;
        assert_eq!(origin, ConfigOrigin::Defaults);
    }

    #[tokio::test]
    async fn primary_wins_when_available() {
        let dir = tempdir().unwrap();
        let file = ConfigFile::new(dir.path().join("cameras.json"));
        file.save_cameras(&default_cameras()[..1]).await.unwrap();

        let local = Arc::new(MemoryLocalStore::new());
        local
            .set(LOCAL_CONFIG_KEY, r#"{"cameras": []}"#)
            .await
            .unwrap();

        let reconciler = ConfigReconciler::new(Some(Arc::new(file)), local);
        let (snapshot, origin) = reconciler.load().await;
        assert_eq!(origin, ConfigOrigin::Primary);
        assert_eq!(snapshot.cameras.len(), 1);
        assert!(
            !snapshot.available_detection_objects.is_empty(),
            "empty vocabulary filled from defaults"
        );
    }

    #[tokio::test]
    async fn save_updates_memory_even_when_primary_fails() {
        let local = Arc::new(MemoryLocalStore::new());
        let reconciler = ConfigReconciler::new(failing(), local.clone());
        reconciler.load().await;

        let cams = default_cameras()[1..3].to_vec();
        let outcome = reconciler.update_cameras(cams.clone()).await;

        assert_eq!(outcome, SaveOutcome { primary: false, local: true });
        assert_eq!(reconciler.cameras().await, cams);

        let stored = local.get(LOCAL_CONFIG_KEY).await.unwrap().unwrap();
        let stored: ConfigSnapshot = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.cameras, cams);
    }

    #[tokio::test]
    async fn save_with_no_working_sink_still_updates_memory() {
        let reconciler = ConfigReconciler::new(failing(), Arc::new(ReadOnlyStore));
        reconciler.load().await;

        let cams = default_cameras()[..2].to_vec();
        let outcome = reconciler.update_cameras(cams.clone()).await;

        assert_eq!(outcome, SaveOutcome { primary: false, local: false });
        assert!(!outcome.persisted());
        assert_eq!(reconciler.cameras().await, cams);
    }

    #[tokio::test]
    async fn save_writes_primary_and_local_copy() {
        let dir = tempdir().unwrap();
        let file = Arc::new(ConfigFile::new(dir.path().join("cameras.json")));
        let local = Arc::new(MemoryLocalStore::new());
        let reconciler = ConfigReconciler::new(Some(file.clone()), local.clone());

        let outcome = reconciler.update_cameras(default_cameras()).await;
        assert!(outcome.primary && outcome.local);
        assert_eq!(file.load().await.unwrap().cameras, default_cameras());
        assert!(local.get(LOCAL_CONFIG_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn edit_and_remove_camera() {
        let reconciler = ConfigReconciler::new(None, Arc::new(MemoryLocalStore::new()));
        reconciler.load().await;

        let outcome = reconciler
            .edit_camera("cam2", |c| c.recording_enabled = false)
            .await
            .unwrap();
        assert!(outcome.local);
        assert!(!reconciler.cameras().await[1].recording_enabled);

        assert!(reconciler.edit_camera("nope", |_| {}).await.is_none());

        let (removed, _) = reconciler.remove_camera("cam1").await.unwrap();
        assert_eq!(removed.id, "cam1");
        assert_eq!(reconciler.cameras().await.len(), 3);
    }
}
