//! Static tool registry.
//!
//! Tools are registered once at startup from a fixed list; there is no
//! runtime discovery.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use thiserror::Error;
use toolbridge_core::protocol::ToolDescriptor;
use toolbridge_core::{Tool, ToolOutput};

/// Dispatch targeted a tool name not present in the registry.
#[derive(Debug, Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownTool(pub String);

/// Registry of tool handlers, keyed by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build a registry from a fixed list of tools.
    ///
    /// Duplicate names keep the first registration; later ones are
    /// dropped with a warning.
    #[must_use]
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut kept: Vec<Arc<dyn Tool>> = Vec::with_capacity(tools.len());
        let mut index = HashMap::new();

        for tool in tools {
            let name = tool.name();
            if index.contains_key(name) {
                tracing::warn!(tool = name, "duplicate tool registration dropped");
                continue;
            }
            index.insert(name, kept.len());
            tracing::debug!(tool = name, "tool registered");
            kept.push(tool);
        }

        Self { tools: kept, index }
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Descriptors for `tools/list`, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Invoke a tool by name.
    ///
    /// Handler-level failures are folded into an error payload here, so a
    /// call never surfaces a transport-level fault for an upstream error.
    ///
    /// # Errors
    /// Only for unknown tool names.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<ToolOutput, UnknownTool> {
        let tool = self.get(name).ok_or_else(|| UnknownTool(name.to_string()))?;

        match tool.call(args).await {
            Ok(output) => Ok(output),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                Ok(ToolOutput::error(format!("Error: {e}")))
            }
        }
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
