//! RealtimeHub - WebSocket Session Distribution
//!
//! ## Responsibilities
//!
//! - WebSocket connection management
//! - Per-session outbound channels for evaluation results
//!
//! Each session owns an unbounded channel; pushing a frame never blocks the
//! producing task. A session that disappeared between lookup and send is a
//! no-op, not an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new session
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, tx);
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(session_id = %id, "Client connected");

        (id, rx)
    }

    /// Unregister a session
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(session_id = %id, "Client disconnected");
        }
    }

    /// Push a pre-serialized frame to one session.
    ///
    /// Returns false when the session is gone or its receiver closed.
    pub async fn send_to_session(&self, id: &Uuid, frame: String) -> bool {
        let connections = self.connections.read().await;
        match connections.get(id) {
            Some(tx) => match tx.send(frame) {
                Ok(()) => true,
                Err(_) => {
                    tracing::debug!(session_id = %id, "Session channel closed; frame dropped");
                    false
                }
            },
            None => {
                tracing::debug!(session_id = %id, "Session gone; frame dropped");
                false
            }
        }
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_send() {
        let hub = RealtimeHub::new();
        let (id, mut rx) = hub.register().await;
        assert_eq!(hub.connection_count(), 1);

        assert!(hub.send_to_session(&id, "frame".to_string()).await);
        assert_eq!(rx.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_send_to_gone_session_is_noop() {
        let hub = RealtimeHub::new();
        let (id, _rx) = hub.register().await;
        hub.unregister(&id).await;

        assert!(!hub.send_to_session(&id, "frame".to_string()).await);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_send_to_dropped_receiver_is_noop() {
        let hub = RealtimeHub::new();
        let (id, rx) = hub.register().await;
        drop(rx);

        assert!(!hub.send_to_session(&id, "frame".to_string()).await);
    }

    #[tokio::test]
    async fn test_unregister_twice_counts_once() {
        let hub = RealtimeHub::new();
        let (id, _rx) = hub.register().await;
        hub.unregister(&id).await;
        hub.unregister(&id).await;
        assert_eq!(hub.connection_count(), 0);
    }
}
