use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Attempts after which a retry entry is dropped.
pub const MAX_RETRIES: u32 = 5;

pub const CHECK_SUBSCRIPTION_EVENT: &str = "check_subscription";
pub const BONUS_EVENT: &str = "bonus";

/// A failed relay attempt stored in the datastore `retry` collection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryEntry {
    pub id: String,
    pub serial: String,
    pub event: String,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRetryEntry {
    pub serial: String,
    pub event: String,
    pub retry_count: u32,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryAttempt {
    pub retry_count: u32,
    pub error_message: String,
    pub timestamp: String,
}

/// What a retry entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// A webhook delivery whose relay pipeline failed.
    DeviceEvent,
    /// A failed subscription lookup or bonus award of the bonus workers.
    BonusCheck,
}

impl NewRetryEntry {
    pub fn new(serial: &str, event: &str, error_message: String) -> NewRetryEntry {
        NewRetryEntry {
            serial: serial.to_string(),
            event: event.to_string(),
            retry_count: 0,
            error_message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl RetryEntry {
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= MAX_RETRIES
    }

    pub fn kind(&self) -> RetryKind {
        match self.event.as_str() {
            CHECK_SUBSCRIPTION_EVENT | BONUS_EVENT => RetryKind::BonusCheck,
            _ => RetryKind::DeviceEvent,
        }
    }

    /// The next failed attempt: one more retry, with the latest error.
    pub fn next_attempt(&self, error_message: String) -> RetryAttempt {
        RetryAttempt {
            retry_count: self.retry_count.saturating_add(1),
            error_message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
