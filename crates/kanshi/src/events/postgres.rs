//! Events in the PostgreSQL `events` table
//!
//! Each filter shape maps to one fixed, parameterized statement.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::debug;

use super::{DetectionEvent, EventFilter, EventQuery, EventStore, EVENT_QUERY_LIMIT};

const EVENT_COLUMNS: &str = "id, camera_id, class_name, ts, thumbnail, score::float8 AS score, \
     video_path, duration, size, created_at";

/// Row shape shared by the event and recording queries
#[derive(Debug, Clone, FromRow)]
pub(crate) struct EventRow {
    pub id: String,
    pub camera_id: String,
    pub class_name: Option<String>,
    pub ts: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub score: Option<f64>,
    pub video_path: Option<String>,
    pub duration: Option<String>,
    pub size: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<EventRow> for DetectionEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            camera_id: row.camera_id,
            class_name: row.class_name.unwrap_or_default(),
            ts: row.ts,
            thumbnail: row.thumbnail,
            score: row.score,
            video_path: row.video_path,
            duration: row.duration,
            size: row.size,
            created_at: row.created_at,
            extra: Default::default(),
        }
    }
}

/// SELECT statement for a query shape. Placeholders are numbered in
/// camera, start, end order, skipping absent parts.
pub(crate) fn select_sql(query: EventQuery) -> String {
    let condition = match query {
        EventQuery::CameraAndRange => "WHERE camera_id = $1 AND ts >= $2 AND ts <= $3",
        EventQuery::Camera => "WHERE camera_id = $1",
        EventQuery::Range => "WHERE ts >= $1 AND ts <= $2",
        EventQuery::All => "",
    };
    format!(
        "SELECT {} FROM events {} ORDER BY ts DESC LIMIT {}",
        EVENT_COLUMNS, condition, EVENT_QUERY_LIMIT
    )
}

/// Run the SELECT matching `filter`
pub(crate) async fn fetch_rows(pool: &PgPool, filter: &EventFilter) -> Result<Vec<EventRow>> {
    let query = filter.query();
    let sql = select_sql(query);
    let mut q = sqlx::query_as::<_, EventRow>(&sql);

    if let Some(camera) = filter.camera_id.as_deref() {
        if matches!(query, EventQuery::Camera | EventQuery::CameraAndRange) {
            q = q.bind(camera);
        }
    }
    if let Some((start, end)) = filter.range() {
        q = q.bind(start).bind(end);
    }

    q.fetch_all(pool).await.context("Event query failed")
}

pub(crate) async fn delete_row(pool: &PgPool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Event delete failed")?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn insert_row(pool: &PgPool, event: &DetectionEvent) -> Result<EventRow> {
    let sql = format!(
        "INSERT INTO events (id, camera_id, class_name, ts, thumbnail, score, video_path, duration, size) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
        EVENT_COLUMNS
    );
    sqlx::query_as::<_, EventRow>(&sql)
        .bind(&event.id)
        .bind(&event.camera_id)
        .bind(&event.class_name)
        .bind(event.ts)
        .bind(&event.thumbnail)
        .bind(event.score)
        .bind(&event.video_path)
        .bind(&event.duration)
        .bind(&event.size)
        .fetch_one(pool)
        .await
        .context("Event insert failed")
}

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventStore for PgEventStore {
    async fn list(&self, filter: &EventFilter) -> Result<Vec<DetectionEvent>> {
        let rows = fetch_rows(&self.pool, filter).await?;
        debug!("Found {} events", rows.len());
        Ok(rows.into_iter().map(DetectionEvent::from).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        delete_row(&self.pool, id).await
    }

    async fn insert(&self, event: DetectionEvent) -> Result<DetectionEvent> {
        Ok(insert_row(&self.pool, &event).await?.into())
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .context("Event count failed")?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_query_is_ordered_and_capped() {
        for query in [
            EventQuery::CameraAndRange,
            EventQuery::Camera,
            EventQuery::Range,
            EventQuery::All,
        ] {
            let sql = select_sql(query);
            assert!(sql.ends_with("ORDER BY ts DESC LIMIT 100"), "{}", sql);
        }
    }

    #[test]
    fn placeholders_follow_filter_shape() {
        let sql = select_sql(EventQuery::CameraAndRange);
        assert!(sql.contains("camera_id = $1 AND ts >= $2 AND ts <= $3"));

        let sql = select_sql(EventQuery::Range);
        assert!(sql.contains("ts >= $1 AND ts <= $2"));
        assert!(!sql.contains("camera_id ="));

        assert!(!select_sql(EventQuery::All).contains("WHERE"));
    }
}
