//! Recordings
//!
//! A recording is the dashboard's view of a stored clip. With a database the
//! view is derived from `events` rows; with JSON files it is stored as-is.

pub mod json;
pub mod postgres;
pub mod scan;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{DetectionEvent, EventFilter};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub camera_id: String,
    #[serde(default)]
    pub camera_name: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// `HH:MM:SS`
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default = "unknown")]
    pub duration: String,
    #[serde(default = "unknown")]
    pub size: String,
    #[serde(default = "one")]
    pub events: u32,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub thumbnail: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn one() -> u32 {
    1
}

impl Recording {
    /// Start of the recording, when `date` (and optionally `startTime`) parse
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(&self.start_time, "%H:%M:%S")
            .ok()
            .or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
        Some(NaiveDateTime::new(date, time).and_utc())
    }
}

impl From<&DetectionEvent> for Recording {
    fn from(event: &DetectionEvent) -> Self {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Self {
            id: event.id.clone(),
            camera_id: event.camera_id.clone(),
            camera_name: format!("Camera {}", event.camera_id),
            date: event.ts.format("%Y-%m-%d").to_string(),
            start_time: event.ts.format("%H:%M:%S").to_string(),
            end_time: String::new(),
            duration: non_empty(&event.duration).unwrap_or_else(unknown),
            size: non_empty(&event.size).unwrap_or_else(unknown),
            events: 1,
            path: non_empty(&event.video_path).unwrap_or_else(|| format!("{}.mkv", event.id)),
            thumbnail: event.thumbnail.clone().unwrap_or_default(),
        }
    }
}

/// Recording persistence backend
#[async_trait::async_trait]
pub trait RecordingStore: Send + Sync {
    /// Recordings matching `filter`, newest first, capped like event queries
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Recording>>;

    /// Store the event behind a new recording and return it as persisted
    async fn insert(&self, event: DetectionEvent) -> Result<DetectionEvent>;

    /// Delete by id. Returns false when nothing matched.
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub use json::JsonRecordingStore;
pub use postgres::PgRecordingStore;
pub use scan::{scan_recordings, CameraRecordings, RecordingFile};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> DetectionEvent {
        serde_json::from_value(serde_json::json!({
            "id": "evt_7",
            "camera_id": "cam2",
            "class_name": "car",
            "ts": "2024-06-03T14:05:09Z",
            "duration": "",
        }))
        .unwrap()
    }

    #[test]
    fn recording_view_of_event() {
        let rec = Recording::from(&event());
        assert_eq!(rec.camera_name, "Camera cam2");
        assert_eq!(rec.date, "2024-06-03");
        assert_eq!(rec.start_time, "14:05:09");
        assert_eq!(rec.duration, "Unknown");
        assert_eq!(rec.size, "Unknown");
        assert_eq!(rec.events, 1);
        assert_eq!(rec.path, "evt_7.mkv");
        assert_eq!(rec.thumbnail, "");
    }

    #[test]
    fn video_path_wins_over_default() {
        let mut ev = event();
        ev.video_path = Some("cam2/2024-06/2024-06-03/14-05-09.mp4".into());
        assert_eq!(Recording::from(&ev).path, "cam2/2024-06/2024-06-03/14-05-09.mp4");
    }

    #[test]
    fn started_at_parses_date_and_time() {
        let rec = Recording::from(&event());
        assert_eq!(
            rec.started_at(),
            Some(Utc.with_ymd_and_hms(2024, 6, 3, 14, 5, 9).unwrap())
        );

        let loose = Recording {
            start_time: "2:05 PM".into(),
            ..rec.clone()
        };
        assert_eq!(
            loose.started_at(),
            Some(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap())
        );

        let broken = Recording {
            date: "June".into(),
            ..rec
        };
        assert_eq!(broken.started_at(), None);
    }
}
