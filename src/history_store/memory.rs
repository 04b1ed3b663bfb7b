//! In-memory score history (ring buffer per location)

use super::HistoryStore;
use crate::error::Result;
use crate::models::HazardUpdate;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Per-location ring buffer of recent scores
pub struct MemoryHistoryStore {
    scores: RwLock<HashMap<String, VecDeque<f64>>>,
    capacity: usize,
}

impl MemoryHistoryStore {
    /// Create a store with the default per-location capacity
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create a store keeping at most `capacity` scores per location
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn average(&self, location_id: &str, limit: usize) -> Result<f64> {
        let scores = self.scores.read().await;
        let recent: Vec<f64> = match scores.get(location_id) {
            Some(buffer) => buffer.iter().rev().take(limit).copied().collect(),
            None => return Ok(0.0),
        };
        if recent.is_empty() {
            return Ok(0.0);
        }
        Ok(recent.iter().sum::<f64>() / recent.len() as f64)
    }

    async fn record(&self, update: &HazardUpdate) -> Result<()> {
        let mut scores = self.scores.write().await;
        let buffer = scores.entry(update.id.clone()).or_default();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(update.score);
        Ok(())
    }
}
