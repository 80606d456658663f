//! Detection events
//!
//! Events live either in a JSON file or in the `events` table. Both backends
//! return at most [`EVENT_QUERY_LIMIT`] events, newest first.

pub mod json;
pub mod postgres;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of events any query returns
pub const EVENT_QUERY_LIMIT: usize = 100;

/// A detection event. Field names follow the `events` table columns; the
/// camelCase names used by older JSON files are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: String,
    #[serde(alias = "cameraId")]
    pub camera_id: String,
    #[serde(alias = "className", alias = "type", default)]
    pub class_name: String,
    #[serde(alias = "timestamp")]
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(alias = "videoPath", default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(alias = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Fields this type doesn't model, kept so rewrites don't lose them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which of the four fixed queries a filter selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventQuery {
    CameraAndRange,
    Camera,
    Range,
    All,
}

/// Optional camera and time-range restriction. A range only applies when
/// both ends are given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub camera_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn camera(id: impl Into<String>) -> Self {
        Self {
            camera_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Build from raw query parameters. Empty strings count as absent.
    ///
    /// Dates may be RFC 3339 timestamps or plain `YYYY-MM-DD`; a plain end
    /// date covers that whole day.
    pub fn from_params(
        camera_id: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self> {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        Ok(Self {
            camera_id: non_empty(camera_id).map(str::to_string),
            start: non_empty(start_date)
                .map(|s| parse_bound(s, false))
                .transpose()?,
            end: non_empty(end_date)
                .map(|s| parse_bound(s, true))
                .transpose()?,
        })
    }

    pub fn range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start?, self.end?))
    }

    pub fn query(&self) -> EventQuery {
        match (self.camera_id.is_some(), self.range().is_some()) {
            (true, true) => EventQuery::CameraAndRange,
            (true, false) => EventQuery::Camera,
            (false, true) => EventQuery::Range,
            (false, false) => EventQuery::All,
        }
    }

    pub fn matches(&self, camera_id: &str, ts: DateTime<Utc>) -> bool {
        if let Some(id) = &self.camera_id {
            if id != camera_id {
                return false;
            }
        }
        match self.range() {
            Some((start, end)) => start <= ts && ts <= end,
            None => true,
        }
    }
}

fn parse_bound(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date: {:?}", s))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    let time = time.ok_or_else(|| anyhow::anyhow!("Invalid time of day"))?;
    Ok(date.and_time(time).and_utc())
}

/// Event persistence backend
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Events matching `filter`, newest first, at most [`EVENT_QUERY_LIMIT`]
    async fn list(&self, filter: &EventFilter) -> Result<Vec<DetectionEvent>>;

    /// Delete by id. Returns false when nothing matched.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Store one event and return it as persisted
    async fn insert(&self, event: DetectionEvent) -> Result<DetectionEvent>;

    async fn count(&self) -> Result<u64>;

    /// Replace every event with `events` verbatim
    async fn replace_all(&self, _events: Vec<Value>) -> Result<()> {
        anyhow::bail!("This event backend does not support bulk replacement")
    }
}

pub use json::JsonEventStore;
pub use postgres::PgEventStore;
