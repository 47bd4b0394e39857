//! Mock SQL executor tool.
//!
//! Echoes the query back with an empty result set; a placeholder until a
//! real database backend is wired in.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use toolbridge_core::{Tool, ToolError, ToolOutput};

#[derive(Debug, Deserialize)]
struct ExecuteSqlInput {
    query: String,
    database: Option<String>,
}

/// Mock SQL executor.
pub struct ExecuteSqlTool;

#[async_trait]
impl Tool for ExecuteSqlTool {
    fn name(&self) -> &'static str {
        "execute_sql"
    }

    fn description(&self) -> &'static str {
        "Executes a SQL query against the configured database. Required: query. \
         Optional: database (defaults to \"main\")."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "SQL query to execute"},
                "database": {
                    "type": "string",
                    "description": "Database name (defaults to main)"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: ExecuteSqlInput =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let database = input.database.unwrap_or_else(|| "main".to_string());

        let result = json!({
            "database": database,
            "query": input.query,
            "rows": [],
            "affected": 0,
            "time": Utc::now().timestamp_millis(),
        });

        Ok(ToolOutput::text(format!(
            "Database: {database}\nQuery executed:\n{}\n\nResult: {}",
            input.query,
            serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string()),
        )))
    }
}
