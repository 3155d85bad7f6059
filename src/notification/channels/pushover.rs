//! Pushover channel
//!
//! Form POST to the Pushover messages endpoint, authenticated by the
//! application token, addressed to a user key.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::notification::channel::{
    Credentials, NotificationChannel, NotificationMessage, SendResult,
};

/// Pushover messages endpoint
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Default request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Service limits (characters)
pub const MAX_TITLE_LEN: usize = 250;
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Pushover channel configuration
#[derive(Debug, Clone)]
pub struct PushoverConfig {
    /// Messages endpoint
    pub api_url: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            api_url: PUSHOVER_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Request form
#[derive(Debug, Serialize)]
struct PushoverPayload<'a> {
    token: &'a str,
    user: &'a str,
    title: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    priority: i8,
}

/// API response
#[derive(Debug, Deserialize)]
pub struct PushoverResponse {
    pub status: i64,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Pushover channel
#[derive(Debug)]
pub struct PushoverChannel {
    client: Client,
    config: PushoverConfig,
}

impl PushoverChannel {
    pub fn new(config: PushoverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Outcome of one request, plus the request id Pushover assigned to it
    fn interpret(status: reqwest::StatusCode, text: &str) -> (SendResult, Option<String>) {
        let resp = match serde_json::from_str::<PushoverResponse>(text) {
            Ok(resp) => resp,
            Err(_) => {
                let reason = format!("HTTP {}: unexpected response body", status);
                return (SendResult::Failed(reason), None);
            }
        };

        let result = if status.is_success() && resp.status == 1 {
            SendResult::Sent
        } else if !resp.errors.is_empty() {
            SendResult::Failed(resp.errors.join("; "))
        } else {
            SendResult::Failed(format!("HTTP {}", status))
        };
        (result, resp.request)
    }
}

impl NotificationChannel for PushoverChannel {
    fn name(&self) -> &str {
        "pushover"
    }

    fn send(&self, credentials: &Credentials, message: &NotificationMessage) -> Result<SendResult> {
        let payload = PushoverPayload {
            token: &credentials.app_api_token,
            user: &credentials.user_id_token,
            title: truncate(&message.title, MAX_TITLE_LEN),
            message: truncate(&message.body, MAX_MESSAGE_LEN),
            url: message.url.as_deref(),
            priority: message.priority.api_value(),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .form(&payload)
            .send()
            .context("Pushover request failed")?;

        let status = response.status();
        let text = response.text().context("Failed to read Pushover response")?;

        let (result, request) = Self::interpret(status, &text);
        let request = request.as_deref().unwrap_or("-");
        match &result {
            SendResult::Sent => info!(
                channel = "pushover",
                priority = %message.priority,
                request,
                "Push notification sent"
            ),
            SendResult::Failed(reason) => error!(
                channel = "pushover",
                http_status = %status,
                request,
                error = %reason,
                "Pushover rejected notification"
            ),
            SendResult::Skipped(_) => {}
        }

        Ok(result)
    }
}

/// Truncate to `max_len` characters, marking the cut with `...`
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_config_default() {
        let config = PushoverConfig::default();
        assert_eq!(config.api_url, "https://api.pushover.net/1/messages.json");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long message", 10), "this is...");
        // multi-byte characters are never split
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_interpret_success() {
        let (result, request) =
            PushoverChannel::interpret(StatusCode::OK, r#"{"status":1,"request":"abc"}"#);
        assert_eq!(result, SendResult::Sent);
        assert_eq!(request.as_deref(), Some("abc"));
    }

    #[test]
    fn test_interpret_api_errors() {
        let (result, request) = PushoverChannel::interpret(
            StatusCode::BAD_REQUEST,
            r#"{"user":"invalid","errors":["user identifier is invalid"],"status":0,"request":"x"}"#,
        );
        assert_eq!(result, SendResult::Failed("user identifier is invalid".to_string()));
        assert_eq!(request.as_deref(), Some("x"));
    }

    #[test]
    fn test_interpret_status_zero_without_errors() {
        let (result, request) = PushoverChannel::interpret(StatusCode::OK, r#"{"status":0}"#);
        assert_eq!(result, SendResult::Failed("HTTP 200 OK".to_string()));
        assert!(request.is_none());
    }

    #[test]
    fn test_interpret_non_json() {
        let (result, _) =
            PushoverChannel::interpret(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(result, SendResult::Failed(reason) if reason.starts_with("HTTP 502")));
    }
}
