//! Error taxonomy for the notifier

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Required credential missing or blank. Nothing is sent.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Required event field absent or of the wrong type. Nothing is sent.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
    /// Transport could not deliver the message.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
