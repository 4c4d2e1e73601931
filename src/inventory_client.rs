use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::client_error::{ensure_success, ClientError};
use crate::domain::inventory_item::InventoryItem;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Client of the remote inventory API queried by the barcode scanner.
#[derive(Clone)]
pub struct InventoryClient {
    http_client: Client,
    api_url: String,
    token: Secret<String>,
    auth: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error("inventory API is unreachable: {0}")]
    Client(#[from] ClientError),
    #[error("inventory API returned an empty response")]
    EmptyResponse,
    #[error("inventory API returned malformed data: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("barcode {0} was not found")]
    NotFound(String),
}

impl InventoryClient {
    pub fn new(
        api_url: String,
        token: Secret<String>,
        auth: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<InventoryClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(InventoryClient {
            http_client,
            api_url,
            token,
            auth,
        })
    }

    #[tracing::instrument(name = "Fetch product and stock by barcode", skip(self))]
    pub async fn fetch_item(&self, barcode: &str) -> Result<InventoryItem, InventoryError> {
        let response = self
            .http_client
            .get(&self.api_url)
            .header("Token", self.token.expose_secret())
            .header("Authorization", self.auth.expose_secret())
            .query(&[("barcode", barcode)])
            .send()
            .await
            .map_err(ClientError::from)?;
        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(ClientError::from)?;

        if body.trim().is_empty() {
            return Err(InventoryError::EmptyResponse);
        }

        tracing::debug!("Inventory API response: {}", body);

        let item: InventoryItem = serde_json::from_str(&body).map_err(InventoryError::Malformed)?;

        if item.is_empty() {
            return Err(InventoryError::NotFound(barcode.to_string()));
        }

        Ok(item)
    }
}
