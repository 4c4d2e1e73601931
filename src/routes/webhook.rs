use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};

use crate::authentication::{basic_authentication, AuthError};
use crate::config::WebhookSettings;
use crate::domain::device_event::{DeviceEvent, DeviceEventForm};
use crate::jobs::SyncTrigger;
use crate::relay::{Relay, RelayError};
use crate::storage::{ActivityLog, RetryLedger};

#[derive(thiserror::Error)]
pub enum WebhookError {
    #[error("Authentication failed.")]
    Unauthorized(#[source] AuthError),
    #[error("Invalid device event: {0}")]
    InvalidEvent(String),
    #[error("Failed to relay the device event.")]
    Relay(#[source] RelayError),
}

impl std::fmt::Debug for WebhookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;

        if let Some(source) = std::error::Error::source(self) {
            write!(f, "\nCaused by:\n\t{:?}", source)?;
        }

        Ok(())
    }
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            WebhookError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::new(self.status_code());

        if let WebhookError::Unauthorized(_) = self {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="webhook""#),
            );
        }

        response
    }
}

/// Credentials are checked before the body is read, so an unauthenticated
/// request gets 401 whatever it carries.
#[tracing::instrument(
    name = "Handling a device webhook",
    skip(request, payload, settings, relay, ledger, activity, trigger),
    fields(serial, event)
)]
pub async fn handle_webhook(
    request: HttpRequest,
    payload: web::Payload,
    settings: web::Data<WebhookSettings>,
    relay: web::Data<Relay>,
    ledger: web::Data<RetryLedger>,
    activity: web::Data<ActivityLog>,
    trigger: web::Data<SyncTrigger>,
) -> Result<HttpResponse, WebhookError> {
    let credentials = basic_authentication(request.headers()).map_err(WebhookError::Unauthorized)?;
    settings
        .verify(&credentials)
        .map_err(WebhookError::Unauthorized)?;

    let form = web::Form::<DeviceEventForm>::from_request(&request, &mut payload.into_inner())
        .await
        .map_err(|err| WebhookError::InvalidEvent(err.to_string()))?;
    let event = DeviceEvent::try_from(form.into_inner()).map_err(WebhookError::InvalidEvent)?;

    tracing::Span::current()
        .record("serial", tracing::field::display(&event.serial))
        .record("event", tracing::field::display(&event.name));

    match relay.relay(&event.serial).await {
        Ok(subscriber) => {
            activity
                .record(
                    "Subscriber relayed",
                    format!(
                        "serial={}, event={}, uid={}",
                        event.serial, event.name, subscriber.uid
                    ),
                )
                .await;
            trigger.request();

            Ok(HttpResponse::Ok().finish())
        }
        Err(err) => {
            tracing::error!("Relay of serial {} failed: {:?}", event.serial, err);

            if err.is_retryable() {
                ledger
                    .try_record_failure(&event.raw_serial, &event.name, err.detail())
                    .await;
                activity.record(&err.to_string(), err.detail()).await;
            }

            Err(WebhookError::Relay(err))
        }
    }
}
