//! JSON-RPC method dispatch for the streamable endpoint.

use std::sync::Arc;

use serde_json::{Value, json};
use toolbridge_core::protocol::{
    self, CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerInfo,
};
use toolbridge_tools::ToolRegistry;

/// MCP method dispatcher.
///
/// Session routing happens before a request reaches this layer; the
/// service only interprets the JSON-RPC payload.
pub struct McpService {
    tools: Arc<ToolRegistry>,
    info: ServerInfo,
}

impl McpService {
    /// Create a service over a tool registry.
    #[must_use]
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            info: ServerInfo {
                name: "toolbridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Server identity for the info endpoint.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Number of registered tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Handle one request. Returns `None` for notifications.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification acknowledged");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: protocol::PROTOCOL_VERSION.to_string(),
                    capabilities: json!({"tools": {}}),
                    server_info: self.info.clone(),
                };
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::error(id, protocol::SERVER_ERROR, e.to_string()),
                }
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                let tools = self.tools.descriptors();
                JsonRpcResponse::success(id, json!({"tools": tools}))
            }
            "tools/call" => self.call_tool(id, request.params).await,
            other => {
                tracing::debug!(method = other, "method not found");
                JsonRpcResponse::error(
                    id,
                    protocol::METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                )
            }
        };

        Some(response)
    }

    async fn call_tool(
        &self,
        id: Option<protocol::RequestId>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => {
                return JsonRpcResponse::error(
                    id,
                    protocol::INVALID_PARAMS,
                    "Missing tools/call params",
                );
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    protocol::INVALID_PARAMS,
                    format!("Invalid tools/call params: {e}"),
                );
            }
        };

        tracing::info!(tool = %params.name, "tool call");
        match self.tools.dispatch(&params.name, params.arguments).await {
            Ok(output) => match serde_json::to_value(output) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, protocol::SERVER_ERROR, e.to_string()),
            },
            Err(unknown) => {
                JsonRpcResponse::error(id, protocol::INVALID_PARAMS, unknown.to_string())
            }
        }
    }
}
