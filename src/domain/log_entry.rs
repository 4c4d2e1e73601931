use chrono::Utc;
use serde::Serialize;

/// Advisory entry of the datastore `logs` collection.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    #[serde(rename = "error_message")]
    pub message: String,
    pub response: String,
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(message: &str, response: String) -> LogEntry {
        LogEntry {
            message: message.to_string(),
            response,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
