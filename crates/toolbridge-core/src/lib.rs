//! Core abstractions for the toolbridge server.
//!
//! This crate provides the fundamental building blocks:
//! - JSON-RPC 2.0 envelope types for the streamable HTTP endpoint
//! - `Tool` trait and tool result types
//! - Shared error types

pub mod protocol;
pub mod tool;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
pub use tool::{Tool, ToolContent, ToolError, ToolOutput};
