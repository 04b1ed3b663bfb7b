//! hazardwatch library
//!
//! Traffic-camera hazard evaluation and realtime distribution.
//!
//! ## Architecture
//!
//! 1. CameraDirectory - monitored camera metadata
//! 2. SnapshotService - image capture from camera pages
//! 3. DetectionClient - submit/poll adapter for the detection backend
//! 4. TagAnalyzer - detection labels to hazard indicators
//! 5. ScoreEngine - hazard score and spike classification
//! 6. HistoryStore - score history and rolling baseline
//! 7. NarrativeGenerator - human-readable condition summaries
//! 8. WatchRegistry - session interest tracking
//! 9. RealtimeHub - WebSocket distribution
//! 10. ResultBroadcaster - per-location fan-out
//! 11. WatchOrchestrator - periodic re-evaluation loop
//! 12. WebAPI - REST and WebSocket endpoints

pub mod broadcaster;
pub mod camera_directory;
pub mod detection_client;
pub mod error;
pub mod history_store;
pub mod models;
pub mod narrative;
pub mod realtime_hub;
pub mod score_engine;
pub mod snapshot_service;
pub mod state;
pub mod tag_analyzer;
pub mod watch_orchestrator;
pub mod watch_registry;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
