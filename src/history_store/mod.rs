//! HistoryStore - Score History and Rolling Baseline
//!
//! ## Responsibilities
//!
//! - Append one score record per completed evaluation
//! - Serve the rolling average that the spike classifier compares against
//!
//! Two implementations: an in-memory ring buffer for DB-less deployments and
//! tests, and a MySQL repository for durable history.

mod memory;
mod repository;

pub use memory::MemoryHistoryStore;
pub use repository::DbHistoryStore;

use crate::error::Result;
use crate::models::HazardUpdate;
use async_trait::async_trait;

/// Number of recent scores folded into the baseline
pub const BASELINE_WINDOW: usize = 50;

/// Append-only score history per location
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Mean of the most recent `limit` scores; 0.0 for an unknown location
    async fn average(&self, location_id: &str, limit: usize) -> Result<f64>;

    /// Record one completed evaluation
    async fn record(&self, update: &HazardUpdate) -> Result<()>;
}
