//! Generic HTTP request tool.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use toolbridge_core::{Tool, ToolError, ToolOutput};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    const fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Deserialize)]
struct HttpRequestInput {
    url: String,
    #[serde(default)]
    method: Method,
    headers: Option<HashMap<String, String>>,
    body: Option<String>,
}

/// Perform an HTTP request against an external API.
pub struct HttpRequestTool {
    http: reqwest::Client,
}

impl HttpRequestTool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &'static str {
        "http_request"
    }

    fn description(&self) -> &'static str {
        "Performs an HTTP request against an external API. Required: url. Optional: \
         method (GET/POST/PUT/DELETE, defaults to GET), headers, body (sent for \
         POST/PUT only)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Request URL"},
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "DELETE"],
                    "description": "HTTP method (defaults to GET)"
                },
                "headers": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Extra request headers"
                },
                "body": {"type": "string", "description": "Request body for POST/PUT"}
            },
            "required": ["url"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: HttpRequestInput =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let mut request = self
            .http
            .request(input.method.as_reqwest(), &input.url)
            .header("Content-Type", "application/json");

        if let Some(headers) = &input.headers {
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }
        if let Some(body) = input.body {
            if matches!(input.method, Method::Post | Method::Put) {
                request = request.body(body);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        Ok(ToolOutput::text(format!(
            "HTTP {} {}\nStatus: {}\n\nResponse:\n{}",
            input.method.as_str(),
            input.url,
            status,
            text,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_defaults_to_get() {
        let input: HttpRequestInput =
            serde_json::from_value(json!({"url": "http://example.com"})).unwrap();
        assert!(matches!(input.method, Method::Get));
    }

    #[test]
    fn test_method_must_be_whitelisted() {
        let parsed: Result<HttpRequestInput, _> =
            serde_json::from_value(json!({"url": "http://example.com", "method": "PATCH"}));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_upstream_error() {
        let tool = HttpRequestTool::new();
        let err = tool
            .call(json!({"url": "http://127.0.0.1:1/nothing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
    }
}
