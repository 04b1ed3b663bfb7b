//! WatchRegistry - Session Interest Tracking
//!
//! ## Responsibilities
//!
//! - Hold each session's current watch set (replaced wholesale per message)
//! - Serve a deduplicated snapshot of all watched locations to the scheduler
//! - Resolve which sessions are interested in a given location
//!
//! All mutation happens inside a single write-lock critical section and all
//! reads return owned data, so the scheduler never observes a torn update and
//! no caller holds registry internals across a suspension point.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// WatchRegistry instance
pub struct WatchRegistry {
    sessions: RwLock<HashMap<Uuid, HashSet<String>>>,
}

impl WatchRegistry {
    /// Create a new registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the session's interest set atomically.
    ///
    /// Locations are normalized to lowercase and deduplicated; the inbound
    /// list may repeat entries. Returns the normalized set.
    pub async fn register(&self, session_id: Uuid, locations: &[String]) -> Vec<String> {
        let normalized: HashSet<String> =
            locations.iter().map(|l| l.trim().to_lowercase()).collect();
        let result: Vec<String> = normalized.iter().cloned().collect();

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, normalized);

        tracing::debug!(
            session_id = %session_id,
            locations = result.len(),
            "Session watch set replaced"
        );
        result
    }

    /// Remove the session's contribution entirely
    pub async fn unregister(&self, session_id: &Uuid) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            tracing::debug!(session_id = %session_id, "Session watch set removed");
        }
    }

    /// Deduplicated union of every session's interest set at call time.
    ///
    /// Copy-on-read: the returned collection is owned, so concurrent
    /// registrations neither block nor mutate an in-progress iteration.
    pub async fn snapshot(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let union: HashSet<&String> = sessions.values().flatten().collect();
        union.into_iter().cloned().collect()
    }

    /// Sessions whose current set contains the location
    pub async fn sessions_for(&self, location_id: &str) -> Vec<Uuid> {
        let needle = location_id.to_lowercase();
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, locations)| locations.contains(&needle))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of distinct watched locations
    pub async fn watched_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        let union: HashSet<&String> = sessions.values().flatten().collect();
        union.len()
    }

    /// Number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
