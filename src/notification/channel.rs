//! Notification channel trait definition

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::formatter::RenderedMessage;
use super::priority::Priority;

/// Push message handed to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    /// Click-through URL (execution detail view)
    pub url: Option<String>,
    pub priority: Priority,
}

impl NotificationMessage {
    /// Create a simple message
    pub fn new(title: impl Into<String>, body: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: None,
            priority,
        }
    }

    /// Set the click-through URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl From<RenderedMessage> for NotificationMessage {
    fn from(rendered: RenderedMessage) -> Self {
        Self::new(rendered.title, rendered.body, rendered.priority)
    }
}

/// Credentials for the push service
#[derive(Clone, Default)]
pub struct Credentials {
    /// Application API token
    pub app_api_token: String,
    /// User (or group) key the message is addressed to
    pub user_id_token: String,
}

impl Credentials {
    pub fn new(app_api_token: impl Into<String>, user_id_token: impl Into<String>) -> Self {
        Self {
            app_api_token: app_api_token.into(),
            user_id_token: user_id_token.into(),
        }
    }

    /// Both tokens set and non-blank
    pub fn is_complete(&self) -> bool {
        !self.app_api_token.trim().is_empty() && !self.user_id_token.trim().is_empty()
    }
}

// Tokens never show up in logs or panic messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_api_token", &mask_token(&self.app_api_token))
            .field("user_id_token", &mask_token(&self.user_id_token))
            .finish()
    }
}

fn mask_token(token: &str) -> &'static str {
    if token.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Send result
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// Delivered
    Sent,
    /// Not attempted (dry-run)
    Skipped(String),
    /// Rejected by the service or transport failure
    Failed(String),
}

impl SendResult {
    /// Whether the call counts as a successful notification
    pub fn is_ok(&self) -> bool {
        !matches!(self, SendResult::Failed(_))
    }
}

/// Notification channel trait
pub trait NotificationChannel: Send + Sync {
    /// Channel name (for logging)
    fn name(&self) -> &str;

    /// Send one message synchronously. A single attempt, no retry.
    fn send(&self, credentials: &Credentials, message: &NotificationMessage) -> Result<SendResult>;
}
