use std::sync::Arc;

use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::cache::ResponseCache;
use crate::error::{AppError, AppResult};
use crate::infra::octane::scope::{ScopeTransport, SharedSpace};

/// Header the branch and pattern endpoints require.
pub const PRIVATE_API_HEADER: &str = "alm-octane-private";

pub struct OctaneClient {
    transport: ScopeTransport,
}

impl OctaneClient {
    /// `full_url` may point anywhere inside the server; only scheme, host
    /// and port are kept. The sign-in cookie lives in this client's store.
    pub fn new(full_url: &str, headers: HeaderMap, cache: Arc<ResponseCache>) -> AppResult<Self> {
        let parsed = Url::parse(full_url)
            .map_err(|err| AppError::Configuration(format!("invalid Octane url {full_url}: {err}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::Configuration(format!("Octane url {full_url} has no host")))?;
        let base_url = match parsed.port() {
            Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
            None => format!("{}://{host}", parsed.scheme()),
        };

        let mut default_headers = headers;
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .cookie_store(true)
            .default_headers(default_headers)
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build Octane client: {err}")))?;

        Ok(Self {
            transport: ScopeTransport {
                http,
                base_url,
                cache,
            },
        })
    }

    pub fn private_api_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(PRIVATE_API_HEADER, HeaderValue::from_static("true"));
        headers
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    pub async fn sign_in(&self, user: &str, password: &str) -> AppResult<()> {
        info!(user, "signing in to Octane");
        let response = self
            .transport
            .http
            .post(format!("{}/authentication/sign_in", self.transport.base_url))
            .header(CONTENT_TYPE, "application/json")
            .json(&SignInRequest { user, password })
            .send()
            .await
            .map_err(|err| AppError::TrackingTool(format!("failed to call Octane: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::TrackingTool(format!(
                "sign in as {user} failed with {status}: {body}"
            )));
        }
        Ok(())
    }

    pub fn shared_space(&self, shared_space_id: u64) -> SharedSpace {
        SharedSpace::new(&self.transport, shared_space_id)
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    user: &'a str,
    password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> AppResult<OctaneClient> {
        OctaneClient::new(url, HeaderMap::new(), Arc::new(ResponseCache::new()))
    }

    #[test]
    fn keeps_only_scheme_host_and_port() {
        let octane = client("https://octane.example.com:8443/ui/?p=1001/1002").unwrap();
        assert_eq!(octane.base_url(), "https://octane.example.com:8443");
        let octane = client("http://octane.local/").unwrap();
        assert_eq!(octane.base_url(), "http://octane.local");
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(client("not a url"), Err(AppError::Configuration(_))));
    }

    #[test]
    fn private_header_is_set() {
        let headers = OctaneClient::private_api_headers();
        assert_eq!(headers.get(PRIVATE_API_HEADER).unwrap(), "true");
    }
}
