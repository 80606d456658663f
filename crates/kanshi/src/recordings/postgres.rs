//! Recordings backed by the `events` table

use anyhow::Result;
use sqlx::postgres::PgPool;

use super::{Recording, RecordingStore};
use crate::events::postgres::{delete_row, fetch_rows, insert_row};
use crate::events::{DetectionEvent, EventFilter};

pub struct PgRecordingStore {
    pool: PgPool,
}

impl PgRecordingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordingStore for PgRecordingStore {
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Recording>> {
        let rows = fetch_rows(&self.pool, filter).await?;
        Ok(rows
            .into_iter()
            .map(|row| Recording::from(&DetectionEvent::from(row)))
            .collect())
    }

    async fn insert(&self, event: DetectionEvent) -> Result<DetectionEvent> {
        Ok(insert_row(&self.pool, &event).await?.into())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        delete_row(&self.pool, id).await
    }
}
