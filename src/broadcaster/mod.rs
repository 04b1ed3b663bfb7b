//! ResultBroadcaster - Evaluation Fan-Out
//!
//! ## Responsibilities
//!
//! - Deliver a completed evaluation to every session watching its location
//!
//! Delivery is fire-and-forget relative to the scheduler tick: frames land in
//! per-session unbounded channels, so one slow or vanished subscriber never
//! delays other locations or subscribers.

use crate::models::HazardUpdate;
use crate::realtime_hub::RealtimeHub;
use crate::watch_registry::WatchRegistry;
use std::sync::Arc;

/// ResultBroadcaster instance
pub struct ResultBroadcaster {
    registry: Arc<WatchRegistry>,
    hub: Arc<RealtimeHub>,
}

impl ResultBroadcaster {
    /// Create a new broadcaster
    pub fn new(registry: Arc<WatchRegistry>, hub: Arc<RealtimeHub>) -> Self {
        Self { registry, hub }
    }

    /// Deliver one result to every interested session.
    ///
    /// Returns how many sessions actually received the frame.
    pub async fn publish(&self, update: &HazardUpdate) -> usize {
        let sessions = self.registry.sessions_for(&update.id).await;
        if sessions.is_empty() {
            tracing::debug!(location = %update.id, "No watchers; result not delivered");
            return 0;
        }

        let frame = match serde_json::to_string(update) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(location = %update.id, error = %e, "Failed to serialize result");
                return 0;
            }
        };

        let mut delivered = 0;
        for session_id in &sessions {
            if self.hub.send_to_session(session_id, frame.clone()).await {
                delivered += 1;
            }
        }

        tracing::debug!(
            location = %update.id,
            watchers = sessions.len(),
            delivered = delivered,
            "Result delivered"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use crate::tag_analyzer::HazardIndicators;

    fn update(location: &str) -> HazardUpdate {
        HazardUpdate {
            id: location.to_string(),
            location_string: location.to_string(),
            coords: Coordinates { lat: 0.0, lng: 0.0 },
            score: 15.0,
            avg: 10.0,
            delta: 5.0,
            spike: true,
            description: "cones ahead".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            image_ref: String::new(),
            info: HazardIndicators::default(),
        }
    }

    #[tokio::test]
    async fn test_delivers_to_every_watcher() {
        let registry = Arc::new(WatchRegistry::new());
        let hub = Arc::new(RealtimeHub::new());
        let broadcaster = ResultBroadcaster::new(registry.clone(), hub.clone());

        let (s1, mut rx1) = hub.register().await;
        let (s2, mut rx2) = hub.register().await;
        let (_s3, mut rx3) = hub.register().await;

        registry.register(s1, &["main".to_string()]).await;
        registry.register(s2, &["main".to_string()]).await;

        let delivered = broadcaster.publish(&update("main")).await;
        assert_eq!(delivered, 2);

        let frame = rx1.recv().await.unwrap();
        assert!(frame.contains("\"id\":\"main\""));
        assert!(rx2.recv().await.is_some());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_gone_session_does_not_fail_delivery() {
        let registry = Arc::new(WatchRegistry::new());
        let hub = Arc::new(RealtimeHub::new());
        let broadcaster = ResultBroadcaster::new(registry.clone(), hub.clone());

        let (s1, mut rx1) = hub.register().await;
        let (s2, _rx2) = hub.register().await;
        registry.register(s1, &["main".to_string()]).await;
        registry.register(s2, &["main".to_string()]).await;

        // Connection torn down but registry entry still present mid-tick
        hub.unregister(&s2).await;

        let delivered = broadcaster.publish(&update("main")).await;
        assert_eq!(delivered, 1);
        assert!(rx1.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_no_watchers_no_delivery() {
        let registry = Arc::new(WatchRegistry::new());
        let hub = Arc::new(RealtimeHub::new());
        let broadcaster = ResultBroadcaster::new(registry, hub);

        assert_eq!(broadcaster.publish(&update("main")).await, 0);
    }
}
