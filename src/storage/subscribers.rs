use crate::client_error::ClientError;
use crate::datastore_client::DatastoreClient;
use crate::domain::subscriber_record::{
    BonusAwarded, ContactUpdate, NewSubscriberRecord, SubscriberRecord,
};

const COLLECTION: &str = "subscribers";
const PAGE_SIZE: u32 = 100;

/// The `subscribers` collection.
#[derive(Clone)]
pub struct SubscriberStore {
    datastore: DatastoreClient,
}

impl SubscriberStore {
    pub fn new(datastore: DatastoreClient) -> SubscriberStore {
        SubscriberStore { datastore }
    }

    pub async fn create(
        &self,
        subscriber: &NewSubscriberRecord,
    ) -> Result<SubscriberRecord, ClientError> {
        self.datastore.create(COLLECTION, subscriber).await
    }

    pub async fn list_all(&self) -> Result<Vec<SubscriberRecord>, ClientError> {
        self.datastore.list_all(COLLECTION, PAGE_SIZE).await
    }

    pub async fn update_contact(
        &self,
        id: &str,
        contact: &ContactUpdate,
    ) -> Result<SubscriberRecord, ClientError> {
        self.datastore.update(COLLECTION, id, contact).await
    }

    pub async fn mark_bonus_awarded(&self, id: &str) -> Result<SubscriberRecord, ClientError> {
        self.datastore
            .update(COLLECTION, id, &BonusAwarded::new())
            .await
    }
}
