//! Streamable HTTP tool-calling server.
//!
//! Wires the session router, the built-in tool registry and the JSON-RPC
//! service behind a single `/mcp` endpoint.

pub mod config;
pub mod routes;
pub mod service;

pub use config::ServerConfig;
pub use routes::{AppState, SESSION_ID_HEADER, create_router};
pub use service::McpService;
