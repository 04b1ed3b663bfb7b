//! Application state
//!
//! Holds all shared components and state

use crate::camera_directory::CameraDirectory;
use crate::realtime_hub::RealtimeHub;
use crate::watch_orchestrator::WatchOrchestrator;
use crate::watch_registry::WatchRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Camera metadata JSON file
    pub camera_data_path: PathBuf,
    /// Detection backend base URL
    pub detection_url: String,
    /// Optional bearer token for the detection backend
    pub detection_token: Option<String>,
    /// Poll interval against the detection backend in milliseconds
    pub detection_poll_interval_ms: u64,
    /// Poll attempts per detection job
    pub detection_max_polls: u32,
    /// Chat-completions endpoint for narratives
    pub narrative_url: String,
    /// Optional bearer token for the narrative backend
    pub narrative_token: Option<String>,
    /// Narrative model name
    pub narrative_model: String,
    /// MySQL URL; in-memory history when unset
    pub database_url: Option<String>,
    /// Re-evaluation period in seconds
    pub tick_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            camera_data_path: std::env::var("CAMERA_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/cameras.json")),
            detection_url: std::env::var("DETECTION_URL")
                .unwrap_or_else(|_| "http://localhost:7860".to_string()),
            detection_token: std::env::var("DETECTION_TOKEN").ok(),
            detection_poll_interval_ms: std::env::var("DETECTION_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            detection_max_polls: std::env::var("DETECTION_MAX_POLLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            narrative_url: std::env::var("NARRATIVE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com/chat/completions".to_string()),
            narrative_token: std::env::var("NARRATIVE_TOKEN").ok(),
            narrative_model: std::env::var("NARRATIVE_MODEL")
                .unwrap_or_else(|_| "deepseek-chat".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            tick_interval_secs: std::env::var("TICK_INTERVAL_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Camera metadata
    pub directory: Arc<CameraDirectory>,
    /// Session interest sets
    pub registry: Arc<WatchRegistry>,
    /// WebSocket session channels
    pub hub: Arc<RealtimeHub>,
    /// Evaluation loop
    pub orchestrator: Arc<WatchOrchestrator>,
}
