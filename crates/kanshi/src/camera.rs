//! Camera and system configuration types
//!
//! These mirror the JSON documents the dashboard reads and writes, so field
//! names are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Base URL of the go2rtc API used when nothing else is configured
pub const DEFAULT_WEBRTC_SERVER_URL: &str = "http://localhost:1984";

/// A normalized point inside a camera frame. Both axes are in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FencePoint {
    pub x: f64,
    pub y: f64,
}

impl FencePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return the point with both coordinates clamped to the unit square
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_unit(self.x),
            y: clamp_unit(self.y),
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Polygonal region of interest scoping detection on one camera.
///
/// Polygons with fewer than three points are stored as-is; they simply never
/// contain anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualFence {
    pub name: String,
    pub points: Vec<FencePoint>,
    pub enabled: bool,
    #[serde(default)]
    pub detect_objects: Vec<String>,
}

/// One camera as the dashboard knows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    /// Source address registered with the media server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtsp_url: Option<String>,
    /// go2rtc stream name used for playback
    #[serde(default)]
    pub stream_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub detect_objects: Vec<String>,
    #[serde(default)]
    pub recording_enabled: bool,
    #[serde(default)]
    pub snapshots_enabled: bool,
    #[serde(default)]
    pub motion_detection: bool,
    /// 0-100. Only the UI constrains this.
    #[serde(default)]
    pub min_confidence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_fences: Option<Vec<VirtualFence>>,
}

fn default_true() -> bool {
    true
}

impl CameraConfig {
    /// Minimal camera backed by a go2rtc stream of the same name
    pub fn from_stream(name: &str, rtsp_url: Option<String>) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            location: String::new(),
            rtsp_url,
            stream_url: name.to_string(),
            enabled: true,
            resolution: String::new(),
            fps: 0,
            detect_objects: Vec::new(),
            recording_enabled: false,
            snapshots_enabled: false,
            motion_detection: false,
            min_confidence: 0,
            virtual_fences: None,
        }
    }

    pub fn fences(&self) -> &[VirtualFence] {
        self.virtual_fences.as_deref().unwrap_or(&[])
    }
}

/// Return the first camera id that appears more than once, if any
pub fn find_duplicate_id(cameras: &[CameraConfig]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    cameras
        .iter()
        .map(|c| c.id.as_str())
        .find(|id| !seen.insert(*id))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    pub retention_days: u32,
    #[serde(rename = "maxStorageGB")]
    pub max_storage_gb: u32,
    pub snapshot_retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    #[serde(default)]
    pub detection_alerts: Vec<String>,
}

/// Hardware the detector runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Cpu,
    Gpu,
    Tpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSettings {
    pub enabled: bool,
    pub fps: u32,
    pub model_type: ModelType,
}

/// Full system configuration bundled with the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub webrtc_server_url: String,
    pub available_detection_objects: Vec<String>,
    pub cameras: Vec<CameraConfig>,
    pub storage: StorageSettings,
    pub notifications: NotificationSettings,
    pub detection: DetectionSettings,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            webrtc_server_url: DEFAULT_WEBRTC_SERVER_URL.to_string(),
            available_detection_objects: strings(&[
                "person",
                "car",
                "dog",
                "cat",
                "bicycle",
                "motorcycle",
                "bird",
                "package",
                "animal",
                "truck",
                "bus",
            ]),
            cameras: default_cameras(),
            storage: StorageSettings {
                retention_days: 7,
                max_storage_gb: 500,
                snapshot_retention_days: 30,
            },
            notifications: NotificationSettings {
                enabled: true,
                email: None,
                webhook: None,
                detection_alerts: strings(&["person", "package"]),
            },
            detection: DetectionSettings {
                enabled: true,
                fps: 5,
                model_type: ModelType::Cpu,
            },
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rect_fence(name: &str, x0: f64, y0: f64, x1: f64, y1: f64, objects: &[&str]) -> VirtualFence {
    VirtualFence {
        name: name.to_string(),
        points: vec![
            FencePoint::new(x0, y0),
            FencePoint::new(x1, y0),
            FencePoint::new(x1, y1),
            FencePoint::new(x0, y1),
        ],
        enabled: true,
        detect_objects: strings(objects),
    }
}

#[allow(clippy::too_many_arguments)]
fn default_camera(
    n: u32,
    name: &str,
    location: &str,
    resolution: &str,
    fps: u32,
    objects: &[&str],
    snapshots: bool,
    min_confidence: u32,
    fence: Option<VirtualFence>,
) -> CameraConfig {
    CameraConfig {
        id: format!("cam{}", n),
        name: name.to_string(),
        location: location.to_string(),
        rtsp_url: Some(format!("rtsp://example.com/cam{}", n)),
        stream_url: format!("cam{}_overlay", n),
        enabled: true,
        resolution: resolution.to_string(),
        fps,
        detect_objects: strings(objects),
        recording_enabled: true,
        snapshots_enabled: snapshots,
        motion_detection: true,
        min_confidence,
        virtual_fences: fence.map(|f| vec![f]),
    }
}

/// The four demo cameras shipped with the dashboard
pub fn default_cameras() -> Vec<CameraConfig> {
    vec![
        default_camera(
            1,
            "Front Door",
            "Entrance",
            "1920x1080",
            30,
            &["person", "car", "package"],
            true,
            70,
            Some(rect_fence("Entry Zone", 0.2, 0.3, 0.8, 0.9, &["person", "car"])),
        ),
        default_camera(
            2,
            "Backyard",
            "Garden",
            "1920x1080",
            30,
            &["person", "dog", "cat", "animal"],
            true,
            65,
            Some(rect_fence("Perimeter", 0.1, 0.1, 0.9, 0.8, &["person", "animal"])),
        ),
        default_camera(
            3,
            "Garage",
            "Parking",
            "1920x1080",
            25,
            &["person", "car", "bicycle"],
            false,
            75,
            Some(rect_fence("Garage Door", 0.3, 0.4, 0.7, 0.9, &["car", "bicycle"])),
        ),
        default_camera(
            4,
            "Side Entrance",
            "Side Door",
            "1280x720",
            20,
            &["person", "package"],
            true,
            70,
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_four_cameras() {
        let config = SystemConfig::default();
        let ids: Vec<&str> = config.cameras.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["cam1", "cam2", "cam3", "cam4"]);
        assert_eq!(config.webrtc_server_url, DEFAULT_WEBRTC_SERVER_URL);
        assert!(find_duplicate_id(&config.cameras).is_none());
        assert!(config.camera("cam4").unwrap().virtual_fences.is_none());
    }

    #[test]
    fn camera_serializes_camel_case() {
        let cam = &default_cameras()[0];
        let value = serde_json::to_value(cam).unwrap();
        assert_eq!(value["streamUrl"], "cam1_overlay");
        assert_eq!(value["minConfidence"], 70);
        assert_eq!(value["virtualFences"][0]["detectObjects"][0], "person");
        assert_eq!(value["virtualFences"][0]["points"][1]["x"], 0.8);
    }

    #[test]
    fn camera_parses_with_missing_optional_fields() {
        let cam: CameraConfig = serde_json::from_value(serde_json::json!({
            "id": "lobby",
            "name": "Lobby",
            "streamUrl": "lobby",
        }))
        .unwrap();
        assert!(cam.enabled);
        assert!(cam.fences().is_empty());
        assert_eq!(cam.min_confidence, 0);
    }

    #[test]
    fn storage_settings_use_gb_suffix() {
        let value = serde_json::to_value(SystemConfig::default().storage).unwrap();
        assert_eq!(value["maxStorageGB"], 500);
    }

    #[test]
    fn duplicate_id_detected() {
        let mut cams = default_cameras();
        cams[2].id = "cam1".into();
        assert_eq!(find_duplicate_id(&cams), Some("cam1"));
    }

    #[test]
    fn bundled_config_becomes_snapshot() {
        let snapshot: crate::config::ConfigSnapshot = SystemConfig::default().into();
        let ids: Vec<&str> = snapshot.cameras.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["cam1", "cam2", "cam3", "cam4"]);
        assert_eq!(snapshot.webrtc_server_url, DEFAULT_WEBRTC_SERVER_URL);
        assert!(snapshot.available_detection_objects.iter().any(|o| o == "truck"));
    }

    #[test]
    fn fence_point_clamps() {
        let p = FencePoint::new(-0.5, 1.7).clamped();
        assert_eq!(p, FencePoint::new(0.0, 1.0));
        assert_eq!(FencePoint::new(f64::NAN, 0.5).clamped().x, 0.0);
    }
}
