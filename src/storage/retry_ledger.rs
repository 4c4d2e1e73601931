use crate::client_error::ClientError;
use crate::datastore_client::DatastoreClient;
use crate::domain::retry_entry::{NewRetryEntry, RetryAttempt, RetryEntry};

const COLLECTION: &str = "retry";
const PAGE_SIZE: u32 = 100;

/// Pending retries of failed relay attempts, stored in the `retry` collection.
#[derive(Clone)]
pub struct RetryLedger {
    datastore: DatastoreClient,
}

impl RetryLedger {
    pub fn new(datastore: DatastoreClient) -> RetryLedger {
        RetryLedger { datastore }
    }

    /// Appends a new entry with a zero retry count.
    #[tracing::instrument(name = "Add a retry entry", skip(self, error_message))]
    pub async fn record_failure(
        &self,
        serial: &str,
        event: &str,
        error_message: String,
    ) -> Result<RetryEntry, ClientError> {
        let entry = NewRetryEntry::new(serial, event, error_message);
        let created: RetryEntry = self.datastore.create(COLLECTION, &entry).await?;

        tracing::info!(
            "Added retry entry: id={}, serial={}, event={}",
            created.id,
            created.serial,
            created.event
        );

        Ok(created)
    }

    /// Same as [`RetryLedger::record_failure`], for callers that only log a ledger failure.
    pub async fn try_record_failure(&self, serial: &str, event: &str, error_message: String) {
        if let Err(err) = self.record_failure(serial, event, error_message).await {
            tracing::error!("Failed to add a retry entry for {}: {:?}", serial, err);
        }
    }

    pub async fn pending(&self) -> Result<Vec<RetryEntry>, ClientError> {
        self.datastore.list_all(COLLECTION, PAGE_SIZE).await
    }

    pub async fn record_attempt(
        &self,
        entry: &RetryEntry,
        attempt: &RetryAttempt,
    ) -> Result<RetryEntry, ClientError> {
        self.datastore.update(COLLECTION, &entry.id, attempt).await
    }

    pub async fn remove(&self, entry: &RetryEntry) -> Result<(), ClientError> {
        self.datastore.delete(COLLECTION, &entry.id).await
    }
}
