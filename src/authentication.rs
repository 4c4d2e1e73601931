use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::{ExposeSecret, Secret};

use crate::config::WebhookSettings;

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("the 'Authorization' header is missing")]
    MissingHeader,
    #[error("the authorization scheme is not 'Basic'")]
    UnsupportedScheme,
    #[error("the credentials are not valid base64 encoded 'username:password'")]
    MalformedCredentials,
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// Reads HTTP Basic credentials from the request headers.
pub fn basic_authentication(headers: &HeaderMap) -> Result<Credentials, AuthError> {
    let header_value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredentials)?;
    let encoded = header_value
        .strip_prefix("Basic ")
        .ok_or(AuthError::UnsupportedScheme)?;
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;

    Ok(Credentials {
        username: username.to_string(),
        password: Secret::new(password.to_string()),
    })
}

impl WebhookSettings {
    pub fn verify(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if credentials.username == self.username
            && credentials.password.expose_secret() == self.password.expose_secret()
        {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
