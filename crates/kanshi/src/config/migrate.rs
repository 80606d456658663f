//! Legacy field migration for locally stored configuration
//!
//! Older dashboard builds stored full source URLs in `streamUrl` and
//! placeholder media server addresses. Both are rewritten on read.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use super::ConfigSnapshot;
use crate::camera::{CameraConfig, DEFAULT_WEBRTC_SERVER_URL};

/// Media server URLs shipped by earlier builds that never pointed at go2rtc
pub const OBSOLETE_SERVER_URLS: &[&str] = &["https://webrtc.example.com", "http://127.0.0.1:8556"];

/// Reduce a stream reference to the bare go2rtc stream name.
///
/// - `cam1` → `cam1`
/// - `rtsp://127.0.0.1:8556/cam1_overlay` → `cam1_overlay`
/// - `/webrtc/cam3_overlay/whep` → `cam3_overlay`
/// - `/some/path/camera` → `camera`
pub fn extract_stream_name(stream_url: &str) -> String {
    if stream_url.is_empty() {
        return String::new();
    }
    if !stream_url.contains(['/', ':']) {
        return stream_url.to_string();
    }
    if stream_url.starts_with("rtsp://") {
        return last_segment(stream_url).to_string();
    }
    if stream_url.contains("/webrtc/") && stream_url.contains("/whep") {
        return whep_path_name(stream_url).unwrap_or_default().to_string();
    }
    match last_segment(stream_url) {
        "" => stream_url.to_string(),
        name => name.to_string(),
    }
}

fn last_segment(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or("")
}

/// Name captured from the first `/webrtc/<name>/whep` in `s`
fn whep_path_name(s: &str) -> Option<&str> {
    s.match_indices("/webrtc/").find_map(|(i, marker)| {
        let rest = &s[i + marker.len()..];
        let name = rest.split('/').next()?;
        (!name.is_empty() && rest[name.len()..].starts_with("/whep")).then_some(name)
    })
}

/// Whether a stored media server URL must be replaced
pub fn is_obsolete_server_url(url: Option<&str>) -> bool {
    match url {
        None | Some("") => true,
        Some(url) => OBSOLETE_SERVER_URLS.contains(&url),
    }
}

/// Result of reading a stored document
#[derive(Debug, Clone)]
pub struct Migrated {
    pub snapshot: ConfigSnapshot,
    /// Some field was rewritten; the caller should persist `snapshot`
    pub changed: bool,
}

/// Parse a stored configuration and bring it up to date.
///
/// Accepts the current object shape as well as a bare camera array.
/// `default_objects` fills in a missing detection vocabulary.
pub fn migrate_stored(raw: &str, default_objects: &[String]) -> Result<Migrated> {
    let parsed: Value = serde_json::from_str(raw).context("Stored config is not valid JSON")?;

    let (cameras_value, objects_value, url_value) = match &parsed {
        Value::Array(_) => (&parsed, None, None),
        Value::Object(map) => (
            map.get("cameras")
                .context("Stored config has no cameras array")?,
            map.get("availableDetectionObjects"),
            map.get("webrtcServerUrl"),
        ),
        _ => anyhow::bail!("Stored config has unexpected shape"),
    };

    let mut cameras: Vec<CameraConfig> =
        serde_json::from_value(cameras_value.clone()).context("Invalid stored cameras")?;
    let mut changed = false;

    for cam in &mut cameras {
        let name = extract_stream_name(&cam.stream_url);
        if name != cam.stream_url {
            info!(
                camera = %cam.name,
                from = %cam.stream_url,
                to = %name,
                "Migrating camera stream name"
            );
            cam.stream_url = name;
            changed = true;
        }
    }

    let available_detection_objects = match objects_value {
        Some(v @ Value::Array(_)) => {
            serde_json::from_value(v.clone()).context("Invalid stored detection objects")?
        }
        _ => default_objects.to_vec(),
    };

    let stored_url = url_value.and_then(Value::as_str);
    let webrtc_server_url = if is_obsolete_server_url(stored_url) {
        info!(to = DEFAULT_WEBRTC_SERVER_URL, "Migrating media server URL");
        changed = true;
        DEFAULT_WEBRTC_SERVER_URL.to_string()
    } else {
        stored_url.unwrap_or(DEFAULT_WEBRTC_SERVER_URL).to_string()
    };

    Ok(Migrated {
        snapshot: ConfigSnapshot {
            cameras,
            available_detection_objects,
            webrtc_server_url,
        },
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_untouched() {
        assert_eq!(extract_stream_name("cam1_overlay"), "cam1_overlay");
        assert_eq!(extract_stream_name(""), "");
    }

    #[test]
    fn rtsp_urls_reduce_to_last_segment() {
        assert_eq!(extract_stream_name("rtsp://host:8554/camX"), "camX");
        assert_eq!(
            extract_stream_name("rtsp://127.0.0.1:8556/cam1_overlay"),
            "cam1_overlay"
        );
        assert_eq!(extract_stream_name("rtsp://host:8554/"), "");
    }

    #[test]
    fn whep_paths_reduce_to_stream() {
        assert_eq!(extract_stream_name("/webrtc/cam3_overlay/whep"), "cam3_overlay");
        assert_eq!(
            extract_stream_name("http://nvr:8889/webrtc/garage/whep"),
            "garage"
        );
        assert_eq!(extract_stream_name("/webrtc//whep"), "");
    }

    #[test]
    fn other_paths_use_last_nonempty_segment() {
        assert_eq!(extract_stream_name("/some/path/camera_name"), "camera_name");
        assert_eq!(extract_stream_name("/trailing/"), "/trailing/");
        assert_eq!(extract_stream_name("host:8554"), "host:8554");
    }

    #[test]
    fn obsolete_urls() {
        assert!(is_obsolete_server_url(None));
        assert!(is_obsolete_server_url(Some("")));
        assert!(is_obsolete_server_url(Some("https://webrtc.example.com")));
        assert!(is_obsolete_server_url(Some("http://127.0.0.1:8556")));
        assert!(!is_obsolete_server_url(Some("http://nvr.lan:1984")));
    }

    #[test]
    fn migrates_stream_and_server_url() {
        let raw = serde_json::json!({
            "cameras": [
                {"id": "a", "name": "A", "streamUrl": "rtsp://host:554/camX"},
                {"id": "b", "name": "B", "streamUrl": "camY"},
            ],
            "availableDetectionObjects": ["person"],
            "webrtcServerUrl": "https://webrtc.example.com",
        })
        .to_string();

        let migrated = migrate_stored(&raw, &[]).unwrap();
        assert!(migrated.changed);
        assert_eq!(migrated.snapshot.cameras[0].stream_url, "camX");
        assert_eq!(migrated.snapshot.cameras[1].stream_url, "camY");
        assert_eq!(migrated.snapshot.webrtc_server_url, DEFAULT_WEBRTC_SERVER_URL);
        assert_eq!(migrated.snapshot.available_detection_objects, ["person"]);
    }

    #[test]
    fn current_document_is_unchanged() {
        let raw = serde_json::json!({
            "cameras": [{"id": "a", "name": "A", "streamUrl": "camA"}],
            "availableDetectionObjects": [],
            "webrtcServerUrl": "http://nvr.lan:1984",
        })
        .to_string();

        let migrated = migrate_stored(&raw, &["person".into()]).unwrap();
        assert!(!migrated.changed);
        assert_eq!(migrated.snapshot.webrtc_server_url, "http://nvr.lan:1984");
        assert!(migrated.snapshot.available_detection_objects.is_empty());
    }

    #[test]
    fn legacy_array_shape_gets_defaults() {
        let raw = r#"[{"id": "a", "name": "A", "streamUrl": "camA"}]"#;
        let defaults = vec!["car".to_string()];

        let migrated = migrate_stored(raw, &defaults).unwrap();
        assert!(migrated.changed, "missing server URL counts as a migration");
        assert_eq!(migrated.snapshot.cameras.len(), 1);
        assert_eq!(migrated.snapshot.available_detection_objects, defaults);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(migrate_stored("nope", &[]).is_err());
        assert!(migrate_stored(r#"{"webrtcServerUrl": "x"}"#, &[]).is_err());
        assert!(migrate_stored("42", &[]).is_err());
    }
}
