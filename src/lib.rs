//! Job Push Notifier - render job execution events as push notifications

pub mod config;
pub mod error;
pub mod notification;

pub use config::NotifierConfig;
pub use error::{NotifyError, Result};
pub use notification::{
    normalize, render, Credentials, ExecutionEvent, NotificationChannel, NotificationMessage,
    Priority, PushNotifier, PushoverChannel, PushoverConfig, RenderedMessage, SendResult,
};
