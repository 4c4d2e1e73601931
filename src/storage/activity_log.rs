use crate::datastore_client::DatastoreClient;
use crate::domain::log_entry::LogEntry;

const COLLECTION: &str = "logs";

/// Append-only `logs` collection. Writes are best effort and never fail the caller.
#[derive(Clone)]
pub struct ActivityLog {
    datastore: DatastoreClient,
}

impl ActivityLog {
    pub fn new(datastore: DatastoreClient) -> ActivityLog {
        ActivityLog { datastore }
    }

    pub async fn record(&self, message: &str, response: String) {
        let entry = LogEntry::new(message, response);
        let result: Result<serde_json::Value, _> = self.datastore.create(COLLECTION, &entry).await;

        if let Err(err) = result {
            tracing::warn!("Failed to store log entry '{}': {:?}", message, err);
        }
    }
}
