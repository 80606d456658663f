//! Events stored in a JSON file: `{"events": [...]}`

use std::path::PathBuf;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use super::{DetectionEvent, EventFilter, EventStore, EVENT_QUERY_LIMIT};
use crate::jsonfile::JsonListFile;

pub struct JsonEventStore {
    file: JsonListFile,
}

impl JsonEventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonListFile::new(path, "events"),
        }
    }

    async fn parsed(&self) -> Result<Vec<DetectionEvent>> {
        let items = self.file.read_items().await?;
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<DetectionEvent>(item) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping malformed event in {:?}: {}", self.file.path(), e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl EventStore for JsonEventStore {
    async fn list(&self, filter: &EventFilter) -> Result<Vec<DetectionEvent>> {
        let mut events: Vec<DetectionEvent> = self
            .parsed()
            .await?
            .into_iter()
            .filter(|e| filter.matches(&e.camera_id, e.ts))
            .collect();
        events.sort_by(|a, b| b.ts.cmp(&a.ts));
        events.truncate(EVENT_QUERY_LIMIT);
        debug!("Loaded {} events from {:?}", events.len(), self.file.path());
        Ok(events)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.file.remove_by_id(id).await? > 0)
    }

    async fn insert(&self, event: DetectionEvent) -> Result<DetectionEvent> {
        self.file.prepend(serde_json::to_value(&event)?).await?;
        Ok(event)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.file.read_items().await?.len() as u64)
    }

    async fn replace_all(&self, events: Vec<Value>) -> Result<()> {
        self.file.write_items(events).await
    }
}
