use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time;

use crate::client_error::{ensure_success, read_json, ClientError};

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const BULK_REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(30);

/// Client of the backend datastore record collections (`/api/collections/{name}/records`).
#[derive(Clone)]
pub struct DatastoreClient {
    http_client: Client,
    base_url: String,
    admin_token: Secret<String>,
    bulk_timeout: time::Duration,
}

/// One page of a collection listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage<R> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub total_pages: u32,
    pub items: Vec<R>,
}

impl DatastoreClient {
    pub fn new(
        base_url: String,
        admin_token: Secret<String>,
        timeout: Option<time::Duration>,
        bulk_timeout: Option<time::Duration>,
    ) -> Result<DatastoreClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(DatastoreClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token,
            bulk_timeout: bulk_timeout.unwrap_or(BULK_REQUEST_TIMEOUT),
        })
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.records_url(collection), id)
    }

    #[tracing::instrument(name = "Create a datastore record", skip(self, record))]
    pub async fn create<T, R>(&self, collection: &str, record: &T) -> Result<R, ClientError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.records_url(collection))
            .bearer_auth(self.admin_token.expose_secret())
            .json(record)
            .send()
            .await?;

        read_json(response).await
    }

    #[tracing::instrument(name = "Read a datastore record", skip(self))]
    pub async fn get<R: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<R, ClientError> {
        let response = self
            .http_client
            .get(self.record_url(collection, id))
            .bearer_auth(self.admin_token.expose_secret())
            .send()
            .await?;

        read_json(response).await
    }

    #[tracing::instrument(name = "List a page of datastore records", skip(self))]
    pub async fn list_page<R: DeserializeOwned>(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
    ) -> Result<RecordPage<R>, ClientError> {
        let response = self
            .http_client
            .get(self.records_url(collection))
            .bearer_auth(self.admin_token.expose_secret())
            .query(&[("page", page), ("perPage", per_page)])
            .timeout(self.bulk_timeout)
            .send()
            .await?;

        read_json(response).await
    }

    /// Pages through the whole collection. Any page failure fails the listing.
    pub async fn list_all<R: DeserializeOwned>(
        &self,
        collection: &str,
        per_page: u32,
    ) -> Result<Vec<R>, ClientError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let current: RecordPage<R> = self.list_page(collection, page, per_page).await?;
            let is_last_page = current.items.is_empty() || page >= current.total_pages;

            records.extend(current.items);

            if is_last_page {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    #[tracing::instrument(name = "Update a datastore record", skip(self, patch))]
    pub async fn update<T, R>(&self, collection: &str, id: &str, patch: &T) -> Result<R, ClientError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .patch(self.record_url(collection, id))
            .bearer_auth(self.admin_token.expose_secret())
            .json(patch)
            .send()
            .await?;

        read_json(response).await
    }

    #[tracing::instrument(name = "Delete a datastore record", skip(self))]
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        let response = self
            .http_client
            .delete(self.record_url(collection, id))
            .bearer_auth(self.admin_token.expose_secret())
            .send()
            .await?;

        ensure_success(response).await?;

        Ok(())
    }
}
