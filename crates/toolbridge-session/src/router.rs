//! Session lifecycle controller.
//!
//! Owns the context store and transport registry behind a single lock and
//! carries the only cross-cutting policy: session creation, inbound
//! routing (explicit or fallback), and atomic teardown.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::context::{SessionContext, SessionContextStore};
use crate::transport::{TransportHandle, TransportRegistry};

/// Session-layer error. Surfaced as protocol-level errors; never fatal.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Current pointer unset or dangling. Recoverable: ambient fields
    /// read as absent.
    #[error("No active session")]
    NoActiveSession,
    /// Inbound message references a session absent from the registry.
    #[error("Unknown session: {0}")]
    UnknownSession(String),
    /// Non-initialize message without a session id under explicit routing.
    #[error("Missing session ID")]
    MissingSessionId,
    /// Fallback routing requested with zero registered transports.
    #[error("No active connection")]
    NoActiveConnection,
    /// Dispatch to a resolved handle failed (half-closed stream).
    #[error("Transport for session {0} is closed")]
    TransportClosed(String),
}

/// How inbound messages without a session id are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingPolicy {
    /// Reject messages without an explicit session id. Safe under
    /// concurrent sessions.
    #[default]
    ExplicitOnly,
    /// Route to the most recently registered transport and promote that
    /// session to current. Single-tenant best effort: wrong under
    /// concurrent multi-session traffic.
    SingleTenantFallback,
}

/// Connection parameters supplied at stream open.
///
/// Free-form opaque strings; unrecognized keys are dropped upstream and
/// missing keys default to `None`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionParams {
    pub list_id: Option<String>,
    pub agent_id: Option<String>,
    pub user_id: Option<String>,
}

/// Outcome of routing an inbound message.
///
/// Rejections are reported as `Err(SessionError)` and cause no state
/// transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Message belongs to an existing session.
    RoutedToExisting { session_id: String },
    /// An initialize message minted a new session.
    CreatedNew { session_id: String },
}

struct RouterState {
    contexts: SessionContextStore,
    transports: TransportRegistry,
    /// Outbound receivers not yet claimed by a streaming response.
    pending_outbound: std::collections::HashMap<String, mpsc::UnboundedReceiver<Value>>,
}

/// Session lifecycle controller.
///
/// Explicitly constructed and passed by reference; multiple isolated
/// instances can coexist (one per test, normally one per process). The
/// internal lock is held only across map operations, never across an
/// await point.
pub struct SessionRouter {
    policy: RoutingPolicy,
    inner: Mutex<RouterState>,
}

impl SessionRouter {
    /// Create a router with the given fallback policy.
    #[must_use]
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(RouterState {
                contexts: SessionContextStore::new(),
                transports: TransportRegistry::new(),
                pending_outbound: std::collections::HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RouterState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configured routing policy.
    #[must_use]
    pub const fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Open a new session: mint an id, register a transport, and create
    /// the context from the connection parameters, all atomically.
    ///
    /// The outbound receiver stays parked until a streaming response
    /// claims it via [`Self::take_outbound`].
    pub fn open_session(&self, params: ConnectionParams) -> String {
        let session_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.state();
        state
            .transports
            .register(TransportHandle::new(session_id.clone(), tx));
        state.contexts.create(
            session_id.clone(),
            params.list_id,
            params.agent_id,
            params.user_id,
        );
        state.pending_outbound.insert(session_id.clone(), rx);
        drop(state);

        tracing::info!(session_id = %session_id, "session opened");
        session_id
    }

    /// Claim the outbound receiver for a session's streaming response.
    ///
    /// Returns `None` if the session is unknown or the stream was already
    /// claimed.
    pub fn take_outbound(&self, session_id: &str) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.state().pending_outbound.remove(session_id)
    }

    /// Route an inbound message to a session.
    ///
    /// - Explicit known id: routed to the existing transport; that
    ///   session becomes current so ambient lookups agree with the
    ///   transport carrying the response.
    /// - Explicit unknown id: rejected.
    /// - No id + initialize shape: a new session is created.
    /// - No id otherwise: rejected, or resolved through the fallback
    ///   policy when configured.
    ///
    /// # Errors
    /// Returns the rejection reason; the caller turns it into a
    /// protocol-level error response.
    pub fn route_inbound(
        &self,
        session_id: Option<&str>,
        is_initialize: bool,
        params: ConnectionParams,
    ) -> Result<DispatchOutcome, SessionError> {
        if let Some(id) = session_id {
            let mut state = self.state();
            if state.transports.resolve(id).is_none() {
                return Err(SessionError::UnknownSession(id.to_string()));
            }
            state.contexts.set_current(id);
            return Ok(DispatchOutcome::RoutedToExisting {
                session_id: id.to_string(),
            });
        }

        if is_initialize {
            let session_id = self.open_session(params);
            return Ok(DispatchOutcome::CreatedNew { session_id });
        }

        match self.policy {
            RoutingPolicy::ExplicitOnly => Err(SessionError::MissingSessionId),
            RoutingPolicy::SingleTenantFallback => {
                let mut state = self.state();
                let winner = state
                    .transports
                    .resolve_fallback()
                    .map(|h| h.session_id().to_string())
                    .ok_or(SessionError::NoActiveConnection)?;
                // Promote so ambient accessors resolve consistently with
                // the transport that will deliver the response.
                state.contexts.set_current(&winner);
                tracing::debug!(session_id = %winner, "fallback routing selected transport");
                Ok(DispatchOutcome::RoutedToExisting { session_id: winner })
            }
        }
    }

    /// Push a message on a session's transport.
    ///
    /// # Errors
    /// `UnknownSession` if no transport is registered for the id,
    /// `TransportClosed` if the stream side is gone. No retry; the caller
    /// may tear the session down.
    pub fn send_to(&self, session_id: &str, message: Value) -> Result<(), SessionError> {
        let state = self.state();
        let handle = state
            .transports
            .resolve(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        handle
            .send(message)
            .map_err(|_| SessionError::TransportClosed(session_id.to_string()))
    }

    /// Tear down a session: remove transport, context, and any unclaimed
    /// outbound receiver under one lock acquisition. Idempotent.
    pub fn close_session(&self, session_id: &str) {
        let mut state = self.state();
        state.transports.unregister(session_id);
        state.contexts.remove(session_id);
        state.pending_outbound.remove(session_id);
        drop(state);

        tracing::info!(session_id = %session_id, "session closed");
    }

    /// Whether a session is known to the transport registry.
    #[must_use]
    pub fn has_session(&self, session_id: &str) -> bool {
        self.state().transports.resolve(session_id).is_some()
    }

    /// Snapshot of a session's context.
    #[must_use]
    pub fn get_context(&self, session_id: &str) -> Option<SessionContext> {
        self.state().contexts.get(session_id).cloned()
    }

    /// Snapshot of the current session's context.
    #[must_use]
    pub fn get_current_context(&self) -> Option<SessionContext> {
        self.state().contexts.get_current().cloned()
    }

    /// Mark a session current (no-op on unknown ids).
    pub fn set_current(&self, session_id: &str) {
        self.state().contexts.set_current(session_id);
    }

    /// List id of the current session, if any.
    #[must_use]
    pub fn current_list_id(&self) -> Option<String> {
        self.state().contexts.current_list_id()
    }

    /// Agent id of the current session, if any.
    #[must_use]
    pub fn current_agent_id(&self) -> Option<String> {
        self.state().contexts.current_agent_id()
    }

    /// User id of the current session, if any.
    #[must_use]
    pub fn current_user_id(&self) -> Option<String> {
        self.state().contexts.current_user_id()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state().transports.len()
    }
}

impl Default for SessionRouter {
    fn default() -> Self {
        Self::new(RoutingPolicy::default())
    }
}
