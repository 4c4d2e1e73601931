use crate::client_error::ClientError;
use crate::crm_client::{CrmClient, Customer};
use crate::domain::device_serial::DeviceSerial;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_record::{NewSubscriberRecord, SubscriberRecord};
use crate::mailing_list_client::{
    CreateSubscriberBody, ListSubscriber, MailingListClient, SubscriberAttribs,
};
use crate::storage::SubscriberStore;

/// CRM lookup → mailing-list upsert → subscriber persist, for one device serial.
#[derive(Clone)]
pub struct Relay {
    crm: CrmClient,
    mailing_list: MailingListClient,
    subscribers: SubscriberStore,
    list_id: i64,
}

#[derive(thiserror::Error)]
pub enum RelayError {
    #[error("Failed to look up the customer in the CRM.")]
    CustomerLookup(#[source] ClientError),
    #[error("The CRM returned an invalid customer: {0}")]
    InvalidCustomer(String),
    #[error("Failed to upsert the subscriber into the mailing list.")]
    MailingListUpsert(#[source] ClientError),
    #[error("Failed to persist the subscriber.")]
    PersistSubscriber(#[source] ClientError),
}

impl std::fmt::Debug for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;

        if let Some(source) = std::error::Error::source(self) {
            write!(f, "\nCaused by:\n\t{}", source)?;
        }

        Ok(())
    }
}

impl RelayError {
    /// Failures before the mailing list holds the subscriber are worth replaying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RelayError::PersistSubscriber(_))
    }

    /// Detail stored with retry and log entries.
    pub fn detail(&self) -> String {
        match std::error::Error::source(self) {
            Some(source) => format!("{} {}", self, source),
            None => self.to_string(),
        }
    }
}

impl Relay {
    pub fn new(
        crm: CrmClient,
        mailing_list: MailingListClient,
        subscribers: SubscriberStore,
        list_id: i64,
    ) -> Relay {
        Relay {
            crm,
            mailing_list,
            subscribers,
            list_id,
        }
    }

    #[tracing::instrument(name = "Relay a device serial", skip(self), fields(serial = %serial))]
    pub async fn relay(&self, serial: &DeviceSerial) -> Result<SubscriberRecord, RelayError> {
        let customer = self
            .crm
            .lookup_customer(serial)
            .await
            .map_err(RelayError::CustomerLookup)?;
        let body = subscriber_body(&customer, self.list_id)?;
        let list_subscriber = self
            .mailing_list
            .create_subscriber(&body)
            .await
            .map_err(RelayError::MailingListUpsert)?;

        let subscriber = self
            .subscribers
            .create(&new_subscriber_record(&list_subscriber))
            .await
            .map_err(RelayError::PersistSubscriber)?;

        tracing::info!(
            "Saved subscriber: uid={}, email={}, phone={}",
            subscriber.uid,
            subscriber.email,
            subscriber.phone
        );

        Ok(subscriber)
    }
}

fn subscriber_body(customer: &Customer, list_id: i64) -> Result<CreateSubscriberBody, RelayError> {
    let email =
        SubscriberEmail::parse(customer.email.clone()).map_err(RelayError::InvalidCustomer)?;

    Ok(CreateSubscriberBody::new(
        &email,
        customer.full_name(),
        list_id,
        SubscriberAttribs {
            phone: customer.phone.clone(),
            card_number: customer.card_number.clone(),
        },
    ))
}

fn new_subscriber_record(list_subscriber: &ListSubscriber) -> NewSubscriberRecord {
    NewSubscriberRecord::new(
        list_subscriber.id,
        list_subscriber.email.clone(),
        list_subscriber.phone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};

    fn customer(email: &str) -> Customer {
        Customer {
            first_name: String::from("A"),
            last_name: String::from("B"),
            phone: String::from("+1"),
            card_number: String::from("42"),
            email: email.to_string(),
        }
    }

    #[test]
    fn subscriber_body_joins_the_customer_name() {
        let body = assert_ok!(subscriber_body(&customer("a@b.com"), 3));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "email": "a@b.com",
                "name": "A B",
                "status": "enabled",
                "lists": [3],
                "attribs": { "phone": "+1", "card_number": "42" },
            })
        );
    }

    #[test]
    fn customer_with_invalid_email_is_rejected() {
        assert_err!(subscriber_body(&customer("not-an-email"), 3));
    }

    #[test]
    fn only_persist_failures_are_not_retried() {
        let unavailable = || ClientError::UnexpectedStatus {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };

        assert!(RelayError::InvalidCustomer(String::from("bad")).is_retryable());
        assert!(RelayError::CustomerLookup(unavailable()).is_retryable());
        assert!(RelayError::MailingListUpsert(unavailable()).is_retryable());
        assert!(!RelayError::PersistSubscriber(unavailable()).is_retryable());
    }
}
