use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time;

use crate::client_error::{read_json, ClientError};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_status::SubscriptionStatus;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const BULK_REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(30);
const ENABLED_STATUS: &str = "enabled";

/// Client of the mailing-list service subscriber API.
#[derive(Clone)]
pub struct MailingListClient {
    http_client: Client,
    base_url: String,
    username: String,
    api_key: Secret<String>,
    bulk_timeout: time::Duration,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriberBody {
    email: String,
    name: String,
    status: String,
    lists: Vec<i64>,
    attribs: SubscriberAttribs,
}

#[derive(Debug, Serialize)]
pub struct SubscriberAttribs {
    pub phone: String,
    pub card_number: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListSubscriber {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub attribs: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub lists: Vec<ListMembership>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListMembership {
    pub id: i64,
    #[serde(default)]
    pub subscription_status: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriberPage {
    #[serde(default)]
    pub results: Vec<ListSubscriber>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
}

impl CreateSubscriberBody {
    pub fn new(
        email: &SubscriberEmail,
        name: String,
        list_id: i64,
        attribs: SubscriberAttribs,
    ) -> CreateSubscriberBody {
        CreateSubscriberBody {
            email: String::from(email.as_ref()),
            name,
            status: String::from(ENABLED_STATUS),
            lists: vec![list_id],
            attribs,
        }
    }
}

impl ListSubscriber {
    /// The `phone` attribute, empty when it is missing or not a string.
    pub fn phone(&self) -> String {
        self.attribs
            .get("phone")
            .and_then(|phone| phone.as_str())
            .unwrap_or_default()
            .to_string()
    }

    pub fn belongs_to(&self, list_id: i64) -> bool {
        self.lists.iter().any(|list| list.id == list_id)
    }

    /// Whether the membership of `list_id` itself is confirmed. Other lists are ignored.
    pub fn is_confirmed_in(&self, list_id: i64) -> bool {
        self.lists.iter().any(|list| {
            list.id == list_id
                && SubscriptionStatus::parse(&list.subscription_status)
                    .map(|status| status.is_confirmed())
                    .unwrap_or(false)
        })
    }
}

impl MailingListClient {
    pub fn new(
        base_url: String,
        username: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
        bulk_timeout: Option<time::Duration>,
    ) -> Result<MailingListClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(MailingListClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            api_key,
            bulk_timeout: bulk_timeout.unwrap_or(BULK_REQUEST_TIMEOUT),
        })
    }

    fn subscribers_url(&self) -> String {
        format!("{}/api/subscribers", self.base_url)
    }

    #[tracing::instrument(
        name = "Create a mailing-list subscriber",
        skip(self, body),
        fields(subscriber_email = %body.email)
    )]
    pub async fn create_subscriber(
        &self,
        body: &CreateSubscriberBody,
    ) -> Result<ListSubscriber, ClientError> {
        let response = self
            .http_client
            .post(self.subscribers_url())
            .basic_auth(&self.username, Some(self.api_key.expose_secret()))
            .json(body)
            .send()
            .await?;
        let envelope: Envelope<ListSubscriber> = read_json(response).await?;

        Ok(envelope.data)
    }

    #[tracing::instrument(name = "Get a mailing-list subscriber", skip(self))]
    pub async fn get_subscriber(&self, subscriber_id: i64) -> Result<ListSubscriber, ClientError> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.subscribers_url(), subscriber_id))
            .basic_auth(&self.username, Some(self.api_key.expose_secret()))
            .send()
            .await?;
        let envelope: Envelope<ListSubscriber> = read_json(response).await?;

        Ok(envelope.data)
    }

    #[tracing::instrument(name = "List a page of mailing-list subscribers", skip(self))]
    pub async fn list_subscribers(
        &self,
        list_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<SubscriberPage, ClientError> {
        let response = self
            .http_client
            .get(self.subscribers_url())
            .basic_auth(&self.username, Some(self.api_key.expose_secret()))
            .query(&[
                ("list_id", list_id.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .timeout(self.bulk_timeout)
            .send()
            .await?;
        let envelope: Envelope<SubscriberPage> = read_json(response).await?;

        Ok(envelope.data)
    }

    /// Pages through the list and keeps the subscribers that are members of `list_id`.
    pub async fn list_members(
        &self,
        list_id: i64,
        per_page: u32,
    ) -> Result<Vec<ListSubscriber>, ClientError> {
        let mut members = Vec::new();
        let mut page = 1;

        loop {
            let current = self.list_subscribers(list_id, page, per_page).await?;
            let is_last_page = current.results.is_empty()
                || u64::from(page) * u64::from(per_page) >= current.total;

            members.extend(
                current
                    .results
                    .into_iter()
                    .filter(|subscriber| subscriber.belongs_to(list_id)),
            );

            if is_last_page {
                break;
            }
            page += 1;
        }

        Ok(members)
    }
}
