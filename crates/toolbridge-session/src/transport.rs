//! Transport registry: live outbound handles keyed by session id.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer side of the channel is gone (half-closed stream).
    #[error("Transport for session {0} is closed")]
    Closed(String),
}

/// Outbound handle for one session.
///
/// Wraps the sender half of the session's outbound channel; the receiver
/// half is drained by the streaming response attached to the session.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    session_id: String,
    sender: mpsc::UnboundedSender<Value>,
}

impl TransportHandle {
    /// Create a handle from a session id and sender.
    #[must_use]
    pub fn new(session_id: impl Into<String>, sender: mpsc::UnboundedSender<Value>) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
        }
    }

    /// Session this handle belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Push a message to the client.
    ///
    /// # Errors
    /// Returns `TransportError::Closed` if the stream side is gone. The
    /// registry does not retry; the caller surfaces the error and may
    /// unregister the broken handle.
    pub fn send(&self, message: Value) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .map_err(|_| TransportError::Closed(self.session_id.clone()))
    }

    /// Whether the stream side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Registry of live transports.
///
/// Not internally synchronized; the owning router serializes access.
#[derive(Debug, Default)]
pub struct TransportRegistry {
    transports: HashMap<String, TransportHandle>,
    /// Registration order, oldest first. Drives fallback resolution.
    order: Vec<String>,
}

impl TransportRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle (overwrites any prior handle for the id).
    pub fn register(&mut self, handle: TransportHandle) {
        let session_id = handle.session_id().to_string();
        self.order.retain(|id| *id != session_id);
        self.order.push(session_id.clone());
        self.transports.insert(session_id.clone(), handle);
        tracing::debug!(session_id = %session_id, "transport registered");
    }

    /// Look up a handle by session id.
    #[must_use]
    pub fn resolve(&self, session_id: &str) -> Option<&TransportHandle> {
        self.transports.get(session_id)
    }

    /// Resolve the fallback transport for messages without a session id.
    ///
    /// Policy: most recently registered handle wins. Best effort only;
    /// under concurrent sessions the winner is not necessarily the one
    /// the caller meant.
    #[must_use]
    pub fn resolve_fallback(&self) -> Option<&TransportHandle> {
        self.order.last().and_then(|id| self.transports.get(id))
    }

    /// Remove a handle. Idempotent, no error on unknown ids.
    pub fn unregister(&mut self, session_id: &str) {
        self.transports.remove(session_id);
        self.order.retain(|id| id != session_id);
        tracing::debug!(session_id = %session_id, "transport unregistered");
    }

    /// Number of registered transports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transports.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handle(id: &str) -> (TransportHandle, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TransportHandle::new(id, tx), rx)
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = TransportRegistry::new();
        let (h, _rx) = handle("s1");
        registry.register(h);

        assert!(registry.resolve("s1").is_some());
        assert!(registry.resolve("s2").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fallback_prefers_most_recent() {
        let mut registry = TransportRegistry::new();
        let (h1, _rx1) = handle("s1");
        let (h2, _rx2) = handle("s2");
        registry.register(h1);
        registry.register(h2);

        let winner = registry.resolve_fallback().unwrap();
        assert_eq!(winner.session_id(), "s2");

        registry.unregister("s2");
        let winner = registry.resolve_fallback().unwrap();
        assert_eq!(winner.session_id(), "s1");
    }

    #[test]
    fn test_fallback_empty_registry() {
        let registry = TransportRegistry::new();
        assert!(registry.resolve_fallback().is_none());
    }

    #[test]
    fn test_reregister_moves_to_back() {
        let mut registry = TransportRegistry::new();
        let (h1, _rx1) = handle("s1");
        let (h2, _rx2) = handle("s2");
        let (h1_again, _rx3) = handle("s1");
        registry.register(h1);
        registry.register(h2);
        registry.register(h1_again);

        assert_eq!(registry.resolve_fallback().unwrap().session_id(), "s1");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = TransportRegistry::new();
        let (h, _rx) = handle("s1");
        registry.register(h);

        registry.unregister("s1");
        registry.unregister("s1");
        registry.unregister("never-existed");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_send_delivers_to_receiver() {
        let (h, mut rx) = handle("s1");
        h.send(json!({"hello": "world"})).unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got["hello"], "world");
    }

    #[test]
    fn test_send_on_dropped_receiver_errors() {
        let (h, rx) = handle("s1");
        drop(rx);

        let err = h.send(json!({})).unwrap_err();
        assert!(matches!(err, TransportError::Closed(id) if id == "s1"));
    }
}
