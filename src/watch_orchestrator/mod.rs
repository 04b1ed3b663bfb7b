//! WatchOrchestrator - Periodic Location Re-Evaluation
//!
//! ## Responsibilities
//!
//! - Drive the evaluation tick over the registry snapshot
//! - Spawn one task per location; serialize evaluations per location
//! - Run the per-location pipeline: capture -> detect -> classify -> score ->
//!   history -> narrative -> broadcast
//! - Cache the latest result per location for the REST surface
//!
//! Locations evaluate concurrently within a tick. Successive ticks never
//! overlap for one location: an in-flight set is claimed before a task runs
//! and released when it finishes, so a slow detection backend cannot build an
//! unbounded backlog behind a single camera.

use crate::broadcaster::ResultBroadcaster;
use crate::camera_directory::CameraDirectory;
use crate::detection_client::DetectionClient;
use crate::history_store::{HistoryStore, BASELINE_WINDOW};
use crate::models::HazardUpdate;
use crate::narrative::{NarrativeGenerator, FALLBACK_NARRATIVE};
use crate::score_engine::{calculate_score, classify};
use crate::snapshot_service::ImageSource;
use crate::tag_analyzer::analyze_tags;
use crate::watch_registry::WatchRegistry;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Pipeline stage that fell back to a default during an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedStage {
    /// Detection backend timed out or failed; scored an empty tag list
    Detection,
    /// Baseline read failed; classified against 0
    BaselineRead,
    /// History write failed; result still delivered
    HistoryWrite,
    /// Narrative generation failed; placeholder text used
    Narrative,
}

/// Outcome of a single location evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// Result produced and handed to the broadcaster
    Published,
    /// Result produced and delivered, but one or more stages fell back
    Degraded(Vec<DegradedStage>),
    /// No image available this tick; nothing produced
    Skipped,
    /// Location is not in the camera directory
    Unknown,
}

/// WatchOrchestrator instance
pub struct WatchOrchestrator {
    registry: Arc<WatchRegistry>,
    directory: Arc<CameraDirectory>,
    image_source: Arc<dyn ImageSource>,
    detection: Arc<DetectionClient>,
    history: Arc<dyn HistoryStore>,
    narrative: Arc<dyn NarrativeGenerator>,
    broadcaster: Arc<ResultBroadcaster>,
    /// Locations with an evaluation currently running
    in_flight: Mutex<HashSet<String>>,
    /// Most recent result per location
    latest: RwLock<HashMap<String, HazardUpdate>>,
    tick_interval: Duration,
    running: RwLock<bool>,
}

impl WatchOrchestrator {
    /// Create a new WatchOrchestrator
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<WatchRegistry>,
        directory: Arc<CameraDirectory>,
        image_source: Arc<dyn ImageSource>,
        detection: Arc<DetectionClient>,
        history: Arc<dyn HistoryStore>,
        narrative: Arc<dyn NarrativeGenerator>,
        broadcaster: Arc<ResultBroadcaster>,
    ) -> Self {
        Self {
            registry,
            directory,
            image_source,
            detection,
            history,
            narrative,
            broadcaster,
            in_flight: Mutex::new(HashSet::new()),
            latest: RwLock::new(HashMap::new()),
            tick_interval: Duration::from_secs(10),
            running: RwLock::new(false),
        }
    }

    /// Override the tick period
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Start the evaluation loop (background task)
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Orchestrator already running");
                return;
            }
            *running = true;
        }

        tracing::info!(
            tick_interval_sec = self.tick_interval.as_secs(),
            "Starting watch orchestrator"
        );

        let orchestrator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(orchestrator.tick_interval);
            loop {
                interval.tick().await;
                if !*orchestrator.running.read().await {
                    break;
                }
                orchestrator.clone().run_tick().await;
            }
            tracing::info!("Watch orchestrator stopped");
        });
    }

    /// Stop the evaluation loop
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping watch orchestrator");
    }

    /// One tick: evaluate every watched location, each in its own task
    pub async fn run_tick(self: Arc<Self>) {
        let snapshot = self.registry.snapshot().await;
        if snapshot.is_empty() {
            tracing::trace!("Nothing watched; tick skipped");
            return;
        }

        tracing::debug!(locations = snapshot.len(), "Evaluation tick");
        for location in snapshot {
            self.clone().spawn_evaluation(location);
        }
    }

    /// Evaluate the given locations now, outside the tick cadence.
    ///
    /// Used when a subscription arrives so the client is not left waiting for
    /// the next tick. The in-flight guard still applies.
    pub fn evaluate_now(self: Arc<Self>, locations: Vec<String>) {
        for location in locations {
            self.clone().spawn_evaluation(location.to_lowercase());
        }
    }

    /// Most recent result for a location, if any
    pub async fn latest(&self, location_id: &str) -> Option<HazardUpdate> {
        let latest = self.latest.read().await;
        latest.get(&location_id.to_lowercase()).cloned()
    }

    fn spawn_evaluation(self: Arc<Self>, location: String) {
        tokio::spawn(async move {
            if !self.claim(&location).await {
                tracing::debug!(location = %location, "Evaluation still in flight; skipped");
                return;
            }

            let outcome = self.evaluate_and_publish(&location).await;
            self.release(&location).await;

            match &outcome {
                EvalOutcome::Published => {
                    tracing::info!(location = %location, "Evaluation published");
                }
                EvalOutcome::Degraded(stages) => {
                    tracing::warn!(
                        location = %location,
                        stages = ?stages,
                        "Evaluation published with degraded stages"
                    );
                }
                EvalOutcome::Skipped => {
                    tracing::info!(location = %location, "Evaluation skipped; no image");
                }
                EvalOutcome::Unknown => {
                    tracing::warn!(location = %location, "Unknown location; not evaluated");
                }
            }
        });
    }

    async fn claim(&self, location: &str) -> bool {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.insert(location.to_string())
    }

    async fn release(&self, location: &str) {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.remove(location);
    }

    /// Full pipeline for one location.
    ///
    /// History recording runs before fan-out, so the next baseline read sees
    /// this observation even if every watcher is gone by delivery time.
    async fn evaluate_and_publish(&self, location: &str) -> EvalOutcome {
        let camera = match self.directory.lookup(location) {
            Some(camera) => camera.clone(),
            None => return EvalOutcome::Unknown,
        };

        let image = match self.image_source.fetch(&camera).await {
            Ok(Some(data)) => data,
            Ok(None) => return EvalOutcome::Skipped,
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Image source failed");
                return EvalOutcome::Skipped;
            }
        };

        let mut degraded = Vec::new();

        let detection = self.detection.detect(image.clone()).await;
        if detection.is_degraded() {
            degraded.push(DegradedStage::Detection);
        }

        let indicators = analyze_tags(&detection.tags);
        let current = calculate_score(&indicators);

        let baseline = match self.history.average(location, BASELINE_WINDOW).await {
            Ok(avg) => avg,
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Baseline read failed");
                degraded.push(DegradedStage::BaselineRead);
                0.0
            }
        };

        let score = classify(current, baseline);

        let description = match self
            .narrative
            .describe(&detection.tags, score.is_spike, score.current)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Narrative generation failed");
                degraded.push(DegradedStage::Narrative);
                FALLBACK_NARRATIVE.to_string()
            }
        };

        let update = HazardUpdate {
            id: location.to_string(),
            location_string: camera.name.clone(),
            coords: self.directory.coordinates(location),
            score: score.current,
            avg: score.baseline,
            delta: score.delta,
            spike: score.is_spike,
            description,
            timestamp: Utc::now().to_rfc3339(),
            image_ref: format!("data:image/jpeg;base64,{}", BASE64.encode(&image)),
            info: indicators,
        };

        if let Err(e) = self.history.record(&update).await {
            tracing::warn!(location = %location, error = %e, "History write failed");
            degraded.push(DegradedStage::HistoryWrite);
        }

        {
            let mut latest = self.latest.write().await;
            latest.insert(location.to_string(), update.clone());
        }

        self.broadcaster.publish(&update).await;

        if degraded.is_empty() {
            EvalOutcome::Published
        } else {
            EvalOutcome::Degraded(degraded)
        }
    }
}
