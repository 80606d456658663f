//! Recordings stored in a JSON file: `{"recordings": [...]}`

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use super::{Recording, RecordingStore};
use crate::events::{DetectionEvent, EventFilter, EVENT_QUERY_LIMIT};
use crate::jsonfile::JsonListFile;

pub struct JsonRecordingStore {
    file: JsonListFile,
}

impl JsonRecordingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonListFile::new(path, "recordings"),
        }
    }
}

fn in_filter(filter: &EventFilter, rec: &Recording) -> bool {
    if filter.range().is_none() {
        return filter.camera_id.as_deref().is_none_or(|id| id == rec.camera_id);
    }
    // Recordings without a parseable date can't satisfy a range
    rec.started_at()
        .is_some_and(|ts| filter.matches(&rec.camera_id, ts))
}

#[async_trait::async_trait]
impl RecordingStore for JsonRecordingStore {
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Recording>> {
        let mut recordings: Vec<Recording> = Vec::new();
        for item in self.file.read_items().await? {
            match serde_json::from_value::<Recording>(item) {
                Ok(rec) if in_filter(filter, &rec) => recordings.push(rec),
                Ok(_) => {}
                Err(e) => warn!("Skipping malformed recording in {:?}: {}", self.file.path(), e),
            }
        }

        recordings.sort_by(|a, b| {
            (b.date.as_str(), b.start_time.as_str()).cmp(&(a.date.as_str(), a.start_time.as_str()))
        });
        recordings.truncate(EVENT_QUERY_LIMIT);
        debug!("Loaded {} recordings from {:?}", recordings.len(), self.file.path());
        Ok(recordings)
    }

    async fn insert(&self, event: DetectionEvent) -> Result<DetectionEvent> {
        let rec = Recording::from(&event);
        self.file.prepend(serde_json::to_value(&rec)?).await?;
        Ok(event)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.file.remove_by_id(id).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    fn rec(id: &str, camera: &str, date: &str, time: &str) -> serde_json::Value {
        json!({
            "id": id,
            "cameraId": camera,
            "cameraName": format!("Camera {}", camera),
            "date": date,
            "startTime": time,
            "path": format!("{}.mp4", id),
        })
    }

    async fn seeded(dir: &std::path::Path) -> JsonRecordingStore {
        let file = JsonListFile::new(dir.join("recordings.json"), "recordings");
        file.write_items(vec![
            rec("r1", "cam1", "2024-05-01", "08:00:00"),
            rec("r2", "cam2", "2024-05-02", "09:30:00"),
            rec("r3", "cam1", "2024-05-03", "10:00:00"),
            rec("r4", "cam1", "someday", ""),
        ])
        .await
        .unwrap();
        JsonRecordingStore::new(dir.join("recordings.json"))
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let dir = tempdir().unwrap();
        let store = seeded(dir.path()).await;

        let ids: Vec<String> = store
            .list(&EventFilter::camera("cam1"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["r4", "r3", "r1"]);
    }

    #[tokio::test]
    async fn range_excludes_undated() {
        let dir = tempdir().unwrap();
        let store = seeded(dir.path()).await;
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 23, 59, 59).unwrap();

        let ids: Vec<String> = store
            .list(&EventFilter::default().with_range(start, end))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["r2", "r1"]);
    }

    #[tokio::test]
    async fn insert_then_delete() {
        let dir = tempdir().unwrap();
        let store = JsonRecordingStore::new(dir.path().join("recordings.json"));
        let event: DetectionEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "camera_id": "cam3",
            "class_name": "dog",
            "ts": "2024-05-04T06:07:08Z",
        }))
        .unwrap();

        store.insert(event).await.unwrap();
        let listed = store.list(&EventFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "evt_1.mkv");

        assert!(store.delete("evt_1").await.unwrap());
        assert!(!store.delete("evt_1").await.unwrap());
        assert!(store.list(&EventFilter::default()).await.unwrap().is_empty());
    }
}
