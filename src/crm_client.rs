use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time;

use crate::client_error::{ensure_success, read_json, ClientError};
use crate::domain::device_serial::DeviceSerial;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const API_KEY_HEADER: &str = "x-api-key";

/// Client of the CRM customer lookup and bonus award endpoints.
#[derive(Clone)]
pub struct CrmClient {
    http_client: Client,
    lookup_url: String,
    bonus_url: String,
    api_key: Secret<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
struct LookupBody<'a> {
    number: &'a str,
}

#[derive(Serialize)]
struct AwardBonusBody<'a> {
    number: &'a str,
    sum: f64,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl CrmClient {
    pub fn new(
        lookup_url: String,
        bonus_url: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<CrmClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(CrmClient {
            http_client,
            lookup_url,
            bonus_url,
            api_key,
        })
    }

    #[tracing::instrument(name = "Look up a customer by device serial", skip(self), fields(serial = %serial))]
    pub async fn lookup_customer(&self, serial: &DeviceSerial) -> Result<Customer, ClientError> {
        let response = self
            .http_client
            .post(&self.lookup_url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&LookupBody {
                number: serial.as_ref(),
            })
            .send()
            .await?;

        read_json(response).await
    }

    #[tracing::instrument(name = "Award a bonus to a customer", skip(self))]
    pub async fn award_bonus(&self, phone: &str, amount: f64) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(&self.bonus_url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&AwardBonusBody {
                number: phone,
                sum: amount,
            })
            .send()
            .await?;

        ensure_success(response).await?;

        Ok(())
    }
}
