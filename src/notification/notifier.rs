//! Notifier - the entry point the scheduler calls
//!
//! credentials check -> normalize -> render -> one send attempt.
//! Configuration and normalization errors are returned to the caller;
//! delivery failures are logged and reported as `Ok(false)`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::channel::{Credentials, NotificationChannel, NotificationMessage, SendResult};
use super::event::ExecutionEvent;
use super::formatter::{MessageFormatter, RenderedMessage};
use crate::error::{NotifyError, Result};

/// Notifier bound to one set of credentials and one channel
pub struct PushNotifier {
    credentials: Credentials,
    channel: Arc<dyn NotificationChannel>,
    formatter: MessageFormatter,
    /// Render but never send
    dry_run: bool,
}

impl PushNotifier {
    pub fn new(credentials: Credentials, channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            credentials,
            channel,
            formatter: MessageFormatter::new(),
            dry_run: false,
        }
    }

    /// Set dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the message formatter
    pub fn with_formatter(mut self, formatter: MessageFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Channel name
    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// Post a notification for one execution event.
    ///
    /// `_config` is the per-notification configuration supplied by the
    /// scheduler; it is accepted for interface compatibility and not read.
    ///
    /// Returns `Ok(true)` when the message was delivered (or skipped in
    /// dry-run), `Ok(false)` when delivery failed.
    pub fn post_notification(
        &self,
        trigger: &str,
        execution: &Value,
        _config: &Value,
    ) -> Result<bool> {
        let result = self.notify(Some(trigger), execution)?;
        Ok(result.is_ok())
    }

    /// Same pipeline as [`post_notification`](Self::post_notification), reporting the
    /// channel outcome in detail
    pub fn notify(&self, trigger: Option<&str>, execution: &Value) -> Result<SendResult> {
        self.ensure_configured()?;

        let event = ExecutionEvent::from_value(execution)?;
        let rendered = self.formatter.render(trigger, &event);

        Ok(self.deliver(rendered, &event.href))
    }

    /// Normalize and render without sending
    pub fn preview(&self, trigger: Option<&str>, execution: &Value) -> Result<RenderedMessage> {
        let event = ExecutionEvent::from_value(execution)?;
        Ok(self.formatter.render(trigger, &event))
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.credentials.is_complete() {
            Ok(())
        } else {
            Err(NotifyError::Configuration(
                "appApiToken and userIdToken must be set".to_string(),
            ))
        }
    }

    /// One attempt; transport errors are folded into `SendResult::Failed`
    fn deliver(&self, rendered: RenderedMessage, href: &str) -> SendResult {
        let name = self.channel.name().to_string();
        let message = NotificationMessage::from(rendered).with_url(href);

        if self.dry_run {
            info!(channel = %name, title = %message.title, "[DRY-RUN] Would send notification");
            debug!(body = %message.body, "[DRY-RUN] Notification body");
            return SendResult::Skipped("dry-run".to_string());
        }

        match self.channel.send(&self.credentials, &message) {
            Ok(SendResult::Failed(reason)) => {
                warn!(channel = %name, error = %reason, "Notification not sent");
                SendResult::Failed(reason)
            }
            Ok(result) => result,
            Err(e) => {
                let failure = NotifyError::Delivery(format!("{:#}", e));
                warn!(channel = %name, error = %failure, "Notification not sent");
                SendResult::Failed(failure.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::priority::Priority;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every message it is asked to send
    struct MockChannel {
        send_count: AtomicUsize,
        last: Mutex<Option<NotificationMessage>>,
        outcome: fn() -> anyhow::Result<SendResult>,
    }

    impl MockChannel {
        fn new(outcome: fn() -> anyhow::Result<SendResult>) -> Self {
            Self {
                send_count: AtomicUsize::new(0),
                last: Mutex::new(None),
                outcome,
            }
        }

        fn get_send_count(&self) -> usize {
            self.send_count.load(Ordering::SeqCst)
        }

        fn last_message(&self) -> Option<NotificationMessage> {
            self.last.lock().unwrap().clone()
        }
    }

    impl NotificationChannel for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        fn send(
            &self,
            _credentials: &Credentials,
            message: &NotificationMessage,
        ) -> anyhow::Result<SendResult> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(message.clone());
            (self.outcome)()
        }
    }

    fn sent() -> anyhow::Result<SendResult> {
        Ok(SendResult::Sent)
    }

    fn rejected() -> anyhow::Result<SendResult> {
        Ok(SendResult::Failed("application token is invalid".to_string()))
    }

    fn broken() -> anyhow::Result<SendResult> {
        Err(anyhow::anyhow!("connection refused"))
    }

    fn execution() -> Value {
        json!({
            "id": 7,
            "status": "failed",
            "href": "http://rd/execution/show/7",
            "job": { "name": "ETL", "project": "data" }
        })
    }

    fn notifier(channel: Arc<MockChannel>) -> PushNotifier {
        PushNotifier::new(Credentials::new("app-token", "user-key"), channel)
    }

    #[test]
    fn test_post_notification_sends_once() {
        let channel = Arc::new(MockChannel::new(sent));
        let ok = notifier(channel.clone())
            .post_notification("failure", &execution(), &json!({}))
            .unwrap();

        assert!(ok);
        assert_eq!(channel.get_send_count(), 1);

        let message = channel.last_message().unwrap();
        assert_eq!(message.title, "Job 'ETL' has failed!");
        assert_eq!(message.priority, Priority::High);
        assert_eq!(message.url.as_deref(), Some("http://rd/execution/show/7"));
        assert!(message.body.starts_with("Job [FAILURE] #7 failed"));
    }

    #[test]
    fn test_rejected_delivery_returns_false() {
        let channel = Arc::new(MockChannel::new(rejected));
        let ok = notifier(channel.clone())
            .post_notification("success", &execution(), &json!({}))
            .unwrap();

        assert!(!ok);
        // no retry
        assert_eq!(channel.get_send_count(), 1);
    }

    #[test]
    fn test_transport_error_returns_false() {
        let channel = Arc::new(MockChannel::new(broken));
        let result = notifier(channel.clone())
            .notify(Some("success"), &execution())
            .unwrap();

        match result {
            SendResult::Failed(reason) => assert!(reason.contains("connection refused")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(channel.get_send_count(), 1);
    }

    #[test]
    fn test_missing_credentials_is_configuration_error() {
        let channel = Arc::new(MockChannel::new(sent));
        let notifier = PushNotifier::new(Credentials::new("", "user-key"), channel.clone());

        let err = notifier
            .post_notification("start", &execution(), &json!({}))
            .unwrap_err();

        assert!(matches!(err, NotifyError::Configuration(_)));
        assert_eq!(channel.get_send_count(), 0);
    }

    #[test]
    fn test_missing_href_sends_nothing() {
        let channel = Arc::new(MockChannel::new(sent));
        let err = notifier(channel.clone())
            .post_notification("start", &json!({ "job": { "name": "ETL" } }), &json!({}))
            .unwrap_err();

        assert!(matches!(err, NotifyError::MissingRequiredField("href")));
        assert_eq!(channel.get_send_count(), 0);
    }

    #[test]
    fn test_dry_run_does_not_send() {
        let channel = Arc::new(MockChannel::new(sent));
        let notifier = notifier(channel.clone()).with_dry_run(true);

        let result = notifier.notify(Some("start"), &execution()).unwrap();
        assert_eq!(result, SendResult::Skipped("dry-run".to_string()));
        assert_eq!(channel.get_send_count(), 0);

        assert!(notifier.post_notification("start", &execution(), &json!({})).unwrap());
    }

    #[test]
    fn test_preview_skips_credentials() {
        let channel = Arc::new(MockChannel::new(sent));
        let notifier = PushNotifier::new(Credentials::default(), channel.clone());

        let rendered = notifier.preview(Some("start"), &execution()).unwrap();
        assert_eq!(rendered.title, "Job 'ETL' has started.");
        assert_eq!(channel.get_send_count(), 0);
    }
}
