//! Kanshi - NVR dashboard backend
//!
//! Library crate for the dashboard server and its clients. Feature flags
//! control which modules are compiled:
//!
//! - **Core** (always available): camera model, config reconciliation, virtual
//!   fences, go2rtc client, event/recording stores, media helpers
//! - **`web`** (default): axum HTTP API and static UI serving

// Core modules
pub mod camera;
pub mod config;
pub mod db;
pub mod events;
pub mod fence;
pub mod go2rtc;
pub mod media;
pub mod recordings;

mod jsonfile;

pub use camera::{
    CameraConfig, FencePoint, SystemConfig, VirtualFence, DEFAULT_WEBRTC_SERVER_URL,
};
pub use config::{ConfigOrigin, ConfigReconciler, ConfigSnapshot, SaveOutcome};
pub use db::{DbEnv, DbSettings, RedactedString};
pub use events::{DetectionEvent, EventFilter, EventStore, EVENT_QUERY_LIMIT};
pub use fence::{FenceEditor, FenceError};
pub use go2rtc::{Go2rtcClient, Go2rtcError};
pub use recordings::{Recording, RecordingStore};

// Web: axum HTTP API
#[cfg(feature = "web")]
pub mod web;
