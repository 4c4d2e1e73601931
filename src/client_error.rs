use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

/// Failure of a call to one of the collaborating HTTP services.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("failed to decode response: {source}. Response: {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Request(err) if err.is_timeout())
    }
}

/// Turns a non 2xx response into [`ClientError::UnexpectedStatus`], keeping its body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    Err(ClientError::UnexpectedStatus { status, body })
}

/// Reads a successful JSON response. The raw body is kept on decode errors for the logs.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;

    serde_json::from_str(&body).map_err(|source| ClientError::Decode { source, body })
}
