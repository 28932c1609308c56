use std::time::Duration;

use ingest_core::ClientError;
use reqwest::StatusCode;

use crate::{Credential, CredentialStore};

pub(crate) fn build_client(
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);
    if let Some(timeout) = request_timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| ClientError::Network(err.to_string()))
}

pub(crate) fn require_credential(store: &dyn CredentialStore) -> Result<Credential, ClientError> {
    store.get().ok_or(ClientError::AuthenticationRequired)
}

/// Passes 2xx responses through and turns everything else into a [`ClientError`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::AuthenticationExpired);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Remote {
        status: status.as_u16(),
        body,
    })
}

/// Reads a whole JSON body. Undecodable bodies are protocol errors.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| ClientError::Protocol(format!("unexpected response body: {err}")))
}

/// The url is dropped because the progress stream carries the token in its query.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    let err = err.without_url();
    if err.is_timeout() {
        return ClientError::Network(format!("timed out: {err}"));
    }
    ClientError::Network(err.to_string())
}
