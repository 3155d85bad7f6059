//! Notification pipeline - execution event in, push notification out
//!
//! # Flow
//! 1. `event`: normalize the raw execution record into `ExecutionEvent`
//! 2. `formatter` + `priority`: render title, body and priority
//! 3. `channel` / `channels`: hand the message to a push transport
//! 4. `notifier`: tie the steps together for one scheduler call
//!
//! # Example
//! ```ignore
//! use job_push_notifier::notification::{Credentials, PushNotifier, PushoverChannel, PushoverConfig};
//!
//! let channel = PushoverChannel::new(PushoverConfig::default())?;
//! let notifier = PushNotifier::new(Credentials::new("app", "user"), Arc::new(channel));
//! let sent = notifier.post_notification("failure", &execution, &serde_json::json!({}))?;
//! ```

pub mod channel;
pub mod channels;
pub mod event;
pub mod formatter;
pub mod notifier;
pub mod priority;

pub use channel::{Credentials, NotificationChannel, NotificationMessage, SendResult};
pub use channels::{PushoverChannel, PushoverConfig};
pub use event::{
    normalize, EventTime, ExecutionContext, ExecutionEvent, JobInfo, NodeStatus, Status,
};
pub use formatter::{msg, render, MessageFormatter, RenderedMessage};
pub use notifier::PushNotifier;
pub use priority::{get_priority, Priority};
