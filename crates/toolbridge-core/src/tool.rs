//! Tool trait and result types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One piece of tool output content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Plain text payload.
    Text { text: String },
}

/// Result of a tool invocation.
///
/// Upstream failures are reported here as a normal payload with
/// `is_error` set, never as a protocol-level fault: the remote caller
/// always receives a structured result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolOutput {
    /// Build a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Build a successful result carrying pretty-printed JSON.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self::text(text)
    }

    /// Build an error result (still a normal response, not a fault).
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: Some(true),
        }
    }
}

/// Tool invocation error.
///
/// These are caught at the dispatch boundary and folded into an error
/// `ToolOutput`; they never propagate past the handler layer.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Tool not configured: {0}")]
    NotConfigured(String),
}

/// Trait for tool handlers.
///
/// The set of tools is fixed per deployment: implementations are
/// constructed at startup and registered in a static list, not
/// discovered at runtime.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to clients.
    fn name(&self) -> &'static str;

    /// Human-readable description for `tools/list`.
    fn description(&self) -> &'static str;

    /// JSON schema for the tool's input object.
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_output_serialization() {
        let out = ToolOutput::text("42");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "42");
        assert!(json.get("isError").is_none());
    }

    #[test]
    fn test_error_output_sets_flag() {
        let out = ToolOutput::error("upstream timed out");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["isError"], true);
    }
}
