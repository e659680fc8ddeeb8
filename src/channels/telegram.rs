//! Telegram Bot API client.
//!
//! Async client shared by the receive loop and the gateway. Covers the
//! handful of methods the relay needs: credential check, file resolution,
//! streaming download, and status-message send/edit.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

pub const TELEGRAM_DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Client-side timeout for JSON API calls.
const API_TIMEOUT_SECS: u64 = 30;
/// TCP connect timeout for all requests.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors talking to the Bot API.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("telegram api error: {0}")]
    Api(String),
}

/// Client for the Telegram Bot API.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl TelegramChannel {
    /// Create a new client targeting the given Bot API base URL.
    ///
    /// No overall request timeout is set on the client: file downloads can
    /// legitimately run for minutes and their stalls are caught by the
    /// ingestion idle-read deadline. JSON calls set a per-request timeout.
    pub fn new(base_url: String, bot_token: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("failed to build Telegram HTTP client");
        Self {
            client,
            base_url,
            bot_token,
        }
    }

    /// Build the API endpoint URL for a method.
    fn api_url(&self, method: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/bot{}/{}", base, self.bot_token, method)
    }

    /// Build the download URL for a Bot API file path.
    fn file_url(&self, file_path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/file/bot{}/{}", base, self.bot_token, file_path)
    }

    /// Call `getMe`, returning the bot's username.
    ///
    /// Used at startup as a credential check; a failure here means the
    /// token is unusable.
    pub async fn get_me(&self) -> Result<String, ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let result = Self::parse_response(resp).await?;
        Ok(result
            .get("username")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    /// Resolve a file id to a Bot API file path via `getFile`.
    pub async fn get_file(&self, file_id: &str) -> Result<String, ChannelError> {
        let resp = self
            .client
            .post(self.api_url("getFile"))
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .json(&json!({ "file_id": file_id }))
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let result = Self::parse_response(resp).await?;
        result
            .get("file_path")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ChannelError::Api("response missing file_path".to_string()))
    }

    /// Open a streaming download for a Bot API file path.
    ///
    /// The caller consumes `bytes_stream()` on the returned response; the
    /// body is never buffered here.
    pub async fn download_file(&self, file_path: &str) -> Result<reqwest::Response, ChannelError> {
        let resp = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChannelError::Api(format!(
                "file download failed with status {status}"
            )));
        }
        Ok(resp)
    }

    /// Send a text message, returning the new message id.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, ChannelError> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let result = Self::parse_response(resp).await?;
        result
            .get("message_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ChannelError::Api("response missing message_id".to_string()))
    }

    /// Replace the text of a previously sent message.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("editMessageText"))
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Self::parse_response(resp).await?;
        Ok(())
    }

    /// Parse a Bot API response envelope, returning its `result` value.
    async fn parse_response(resp: reqwest::Response) -> Result<Value, ChannelError> {
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();
        interpret_envelope(status, &body_text)
    }
}

/// Interpret the `ok`/`description`/`result` envelope every Bot API method
/// replies with.
fn interpret_envelope(
    status: reqwest::StatusCode,
    body_text: &str,
) -> Result<Value, ChannelError> {
    let parsed: Value = serde_json::from_str(body_text).unwrap_or(Value::Null);

    let ok = parsed
        .get("ok")
        .and_then(|v| v.as_bool())
        .unwrap_or(status.is_success());

    if ok {
        return Ok(parsed.get("result").cloned().unwrap_or(Value::Null));
    }

    let error = parsed
        .get("description")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            if body_text.is_empty() {
                None
            } else {
                Some(body_text.to_string())
            }
        })
        .unwrap_or_else(|| "request failed".to_string());

    Err(ChannelError::Api(format!("{error} (status {status})")))
}
