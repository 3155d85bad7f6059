//! Push priority classification
//!
//! Only a real failure interrupts the user:
//! - HIGH: the job failed (`failure` trigger)
//! - NORMAL: everything else, including retryable failures and unknown triggers
//!
//! Priority depends on the trigger alone, never on the execution status.

/// Priority of a push notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Priority {
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
        }
    }

    /// Pushover API priority value
    pub fn api_value(&self) -> i8 {
        match self {
            Priority::Normal => 0,
            Priority::High => 1,
        }
    }
}

/// Classify priority from the raw trigger value (case-insensitive)
pub fn get_priority(trigger: Option<&str>) -> Priority {
    match trigger {
        Some(t) if t.eq_ignore_ascii_case("failure") => Priority::High,
        _ => Priority::Normal,
    }
}
