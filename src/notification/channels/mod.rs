//! Concrete channels

pub mod pushover;

pub use pushover::{PushoverChannel, PushoverConfig};
