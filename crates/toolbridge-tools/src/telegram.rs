//! Telegram messaging: Bot API client and the send-message tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use toolbridge_core::{Tool, ToolError, ToolOutput};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram credentials.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Telegram client error.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Thin client for the Telegram Bot API.
pub struct TelegramClient {
    config: TelegramConfig,
    http: reqwest::Client,
}

impl TelegramClient {
    /// Create a client from credentials.
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Send a message to the configured chat, with HTML formatting.
    ///
    /// # Errors
    /// Returns `TelegramError::Api` with the API's description on a
    /// non-success response.
    pub async fn send_message(&self, text: &str) -> Result<Value, TelegramError> {
        let url = format!(
            "{TELEGRAM_API_URL}/bot{}/sendMessage",
            self.config.bot_token
        );

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let description = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body["description"].as_str().map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(TelegramError::Api(description));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageInput {
    text: String,
}

/// Send a message to the configured Telegram chat.
pub struct SendTelegramMessageTool {
    client: Option<Arc<TelegramClient>>,
}

impl SendTelegramMessageTool {
    #[must_use]
    pub fn new(client: Option<Arc<TelegramClient>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SendTelegramMessageTool {
    fn name(&self) -> &'static str {
        "send_telegram_message"
    }

    fn description(&self) -> &'static str {
        "Sends a message to the configured Telegram chat. Supports HTML formatting. \
         Required: text."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Message text to send"}
            },
            "required": ["text"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: SendMessageInput =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let client = self.client.as_ref().ok_or_else(|| {
            ToolError::NotConfigured(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set".to_string(),
            )
        })?;

        let result = client
            .send_message(&input.text)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        Ok(ToolOutput::json(&result))
    }
}
