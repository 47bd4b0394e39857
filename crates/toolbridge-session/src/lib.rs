//! Session management for the toolbridge server.
//!
//! Provides:
//! - `SessionContextStore` - Per-session ambient identifiers
//! - `TransportRegistry` - Live outbound handles keyed by session
//! - `SessionRouter` - Lifecycle orchestration and inbound routing

pub mod context;
pub mod router;
pub mod transport;

pub use context::{SessionContext, SessionContextStore};
pub use router::{ConnectionParams, DispatchOutcome, RoutingPolicy, SessionError, SessionRouter};
pub use transport::{TransportHandle, TransportRegistry};
