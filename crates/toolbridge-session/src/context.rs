//! Session context store for per-session ambient identifiers.
//!
//! Connection parameters arrive once at session creation and are immutable
//! afterwards. Tool handlers resolve them through the "current session"
//! pointer rather than receiving them per call.

use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

/// Ambient identifiers for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Opaque session identifier.
    pub session_id: String,
    /// Tenant todo-list id, used as the parent for todo records.
    pub list_id: Option<String>,
    /// Agent id, used to filter records by assignee.
    pub agent_id: Option<String>,
    /// User id owning the data.
    pub user_id: Option<String>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: i64,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn field_or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("not set")
}

/// Store of session contexts plus the "current session" pointer.
///
/// Not internally synchronized; the owning router serializes access.
#[derive(Debug, Default)]
pub struct SessionContextStore {
    contexts: HashMap<String, SessionContext>,
    /// Insertion order, oldest first. Drives current-pointer reassignment.
    order: Vec<String>,
    current: Option<String>,
}

impl SessionContextStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a context for `session_id` and mark it current.
    ///
    /// A second create with the same id overwrites the prior entry
    /// (last write wins, no error on collision).
    pub fn create(
        &mut self,
        session_id: impl Into<String>,
        list_id: Option<String>,
        agent_id: Option<String>,
        user_id: Option<String>,
    ) -> SessionContext {
        let session_id = session_id.into();

        tracing::debug!(
            session_id = %session_id,
            list_id = field_or_unset(list_id.as_deref()),
            agent_id = field_or_unset(agent_id.as_deref()),
            user_id = field_or_unset(user_id.as_deref()),
            "session context created"
        );

        let context = SessionContext {
            session_id: session_id.clone(),
            list_id,
            agent_id,
            user_id,
            created_at: now(),
        };

        self.order.retain(|id| *id != session_id);
        self.order.push(session_id.clone());
        self.contexts.insert(session_id.clone(), context.clone());
        self.current = Some(session_id);

        context
    }

    /// Look up a context by session id.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&SessionContext> {
        self.contexts.get(session_id)
    }

    /// Resolve the current session's context.
    ///
    /// Returns `None` when the pointer is unset or dangling; both are
    /// recoverable "no active session" conditions, not errors.
    #[must_use]
    pub fn get_current(&self) -> Option<&SessionContext> {
        let Some(current) = self.current.as_deref() else {
            tracing::warn!("no active session");
            return None;
        };

        let context = self.contexts.get(current);
        if context.is_none() {
            tracing::warn!(session_id = %current, "current session context not found");
        }
        context
    }

    /// Remove the context for `session_id`. Idempotent.
    ///
    /// If the removed id was current, the pointer moves to the most
    /// recently inserted remaining entry, or to none.
    pub fn remove(&mut self, session_id: &str) {
        self.contexts.remove(session_id);
        self.order.retain(|id| id != session_id);

        if self.current.as_deref() == Some(session_id) {
            self.current = self.order.last().cloned();
        }

        tracing::debug!(session_id = %session_id, "session context removed");
    }

    /// Set the current pointer. Silently no-ops on unknown ids.
    pub fn set_current(&mut self, session_id: &str) {
        if self.contexts.contains_key(session_id) {
            self.current = Some(session_id.to_string());
        }
    }

    /// List id of the current session, if any.
    #[must_use]
    pub fn current_list_id(&self) -> Option<String> {
        self.get_current().and_then(|c| c.list_id.clone())
    }

    /// Agent id of the current session, if any.
    #[must_use]
    pub fn current_agent_id(&self) -> Option<String> {
        self.get_current().and_then(|c| c.agent_id.clone())
    }

    /// User id of the current session, if any.
    #[must_use]
    pub fn current_user_id(&self) -> Option<String> {
        self.get_current().and_then(|c| c.user_id.clone())
    }

    /// Number of stored contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sets_current() {
        let mut store = SessionContextStore::new();
        let ctx = store.create("s1", Some("L1".into()), None, Some("U1".into()));

        assert_eq!(ctx.session_id, "s1");
        assert_eq!(store.get_current().unwrap().session_id, "s1");
        assert_eq!(store.current_list_id().as_deref(), Some("L1"));
        assert_eq!(store.current_agent_id(), None);
        assert_eq!(store.current_user_id().as_deref(), Some("U1"));
    }

    #[test]
    fn test_create_overwrites_same_id() {
        let mut store = SessionContextStore::new();
        store.create("s1", Some("L1".into()), None, None);
        store.create("s1", Some("L2".into()), None, None);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().list_id.as_deref(), Some("L2"));
    }

    #[test]
    fn test_latest_create_wins_current() {
        let mut store = SessionContextStore::new();
        store.create("s1", Some("L1".into()), None, None);
        store.create("s2", Some("L2".into()), None, None);

        assert_eq!(store.get_current().unwrap().session_id, "s2");

        store.set_current("s1");
        assert_eq!(store.current_list_id().as_deref(), Some("L1"));
    }

    #[test]
    fn test_remove_reassigns_current_to_most_recent_remaining() {
        let mut store = SessionContextStore::new();
        store.create("A", None, None, None);
        store.create("B", None, None, None);
        store.create("C", None, None, None);

        store.remove("C");
        assert_eq!(store.get_current().unwrap().session_id, "B");

        store.remove("B");
        store.remove("A");
        assert!(store.get_current().is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = SessionContextStore::new();
        store.create("s1", None, None, None);

        store.remove("s1");
        store.remove("s1");
        store.remove("never-existed");

        assert!(store.is_empty());
        assert!(store.get_current().is_none());
    }

    #[test]
    fn test_remove_noncurrent_keeps_pointer() {
        let mut store = SessionContextStore::new();
        store.create("s1", None, None, None);
        store.create("s2", None, None, None);

        store.remove("s1");
        assert_eq!(store.get_current().unwrap().session_id, "s2");
    }

    #[test]
    fn test_current_pointer_always_resolvable() {
        let mut store = SessionContextStore::new();
        store.create("s1", None, None, None);
        store.create("s2", None, None, None);
        store.create("s3", None, None, None);
        store.remove("s2");
        store.remove("s3");

        let current_id = store.get_current().expect("a session remains").session_id.clone();
        assert!(store.get(&current_id).is_some());
    }

    #[test]
    fn test_set_current_unknown_is_noop() {
        let mut store = SessionContextStore::new();
        store.set_current("unknown");
        assert!(store.get_current().is_none());

        store.create("s1", None, None, None);
        store.set_current("still-unknown");
        assert_eq!(store.get_current().unwrap().session_id, "s1");
    }

    #[test]
    fn test_ambient_accessors_default_to_none() {
        let store = SessionContextStore::new();
        assert_eq!(store.current_list_id(), None);
        assert_eq!(store.current_agent_id(), None);
        assert_eq!(store.current_user_id(), None);
    }
}
