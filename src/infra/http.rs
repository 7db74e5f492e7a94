use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub fn client() -> AppResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))
}

/// Sends the request and returns the body of a 2xx response. Anything else
/// becomes a `ProviderRequest` error carrying the raw body.
pub async fn send(provider: &'static str, request: RequestBuilder) -> AppResult<String> {
    let response = request
        .send()
        .await
        .map_err(|err| AppError::provider(provider, format!("failed to call {provider}: {err}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read response>".to_string());
    if !status.is_success() {
        return Err(AppError::provider(
            provider,
            format!("{provider} responded with {status}: {body}"),
        ));
    }
    Ok(body)
}

pub fn parse<T: DeserializeOwned>(provider: &'static str, body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|err| {
        AppError::provider(
            provider,
            format!("failed to parse {provider} response: {err}: {body}"),
        )
    })
}
