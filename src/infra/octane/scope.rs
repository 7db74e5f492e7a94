use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, header::CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cache::{ResponseCache, cacheable_for};
use crate::domain::entity::{BatchResponse, EntityCollection, FetchParameters, NewEntity};
use crate::error::{AppError, AppResult};
use crate::services::EntityScope;

/// What every scope shares with the client it came from: the signed-in
/// HTTP client, its own base path, and the process-wide GET cache.
#[derive(Clone)]
pub struct ScopeTransport {
    pub http: Client,
    pub base_url: String,
    pub cache: Arc<ResponseCache>,
}

impl ScopeTransport {
    fn nested(&self, path: &str) -> Self {
        Self {
            http: self.http.clone(),
            base_url: format!("{}/{path}", self.base_url),
            cache: Arc::clone(&self.cache),
        }
    }

    fn url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection.trim_start_matches('/'))
    }
}

pub struct SharedSpace {
    transport: ScopeTransport,
}

impl SharedSpace {
    pub(crate) fn new(parent: &ScopeTransport, shared_space_id: u64) -> Self {
        Self {
            transport: parent.nested(&format!("api/shared_spaces/{shared_space_id}")),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    pub fn workspace(&self, workspace_id: u64) -> Workspace {
        Workspace {
            transport: self.transport.nested(&format!("workspaces/{workspace_id}")),
        }
    }
}

pub struct Workspace {
    transport: ScopeTransport,
}

impl Workspace {
    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    async fn write_batch(
        &self,
        method: Method,
        collection: &str,
        entities: &[NewEntity],
    ) -> AppResult<BatchResponse> {
        debug!(%method, collection, count = entities.len(), "writing Octane entities");
        let response = self
            .transport
            .http
            .request(method, self.transport.url(collection))
            .header(CONTENT_TYPE, "application/json")
            .json(&BatchRequest { data: entities })
            .send()
            .await
            .map_err(|err| AppError::TrackingTool(format!("failed to call Octane: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());

        // 409 means some items were rejected; the body still describes the batch.
        if status.is_success() || status == StatusCode::CONFLICT {
            return parse(&body);
        }
        Err(AppError::TrackingTool(format!(
            "Octane responded with {status}: {body}"
        )))
    }
}

#[async_trait]
impl EntityScope for Workspace {
    async fn fetch_collection(
        &self,
        collection: &str,
        parameters: &FetchParameters,
    ) -> AppResult<EntityCollection> {
        let request = self
            .transport
            .http
            .get(self.transport.url(collection))
            .query(&parameters.to_query_pairs())
            .build()
            .map_err(|err| AppError::TrackingTool(format!("invalid Octane request: {err}")))?;
        let url = request.url().to_string();

        if let Some(body) = self.transport.cache.get(&url) {
            debug!(collection, "serving Octane collection from cache");
            return parse(&body);
        }

        debug!(collection, "fetching Octane collection");
        let response = self
            .transport
            .http
            .execute(request)
            .await
            .map_err(|err| AppError::TrackingTool(format!("failed to call Octane: {err}")))?;

        let status = response.status();
        let max_age = cacheable_for(response.headers());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());
        if !status.is_success() {
            return Err(AppError::TrackingTool(format!(
                "Octane responded with {status}: {body}"
            )));
        }

        let collection: EntityCollection = parse(&body)?;
        if let Some(max_age) = max_age {
            self.transport.cache.insert(&url, body, max_age);
        }
        Ok(collection)
    }

    async fn create_entities(
        &self,
        collection: &str,
        entities: &[NewEntity],
    ) -> AppResult<BatchResponse> {
        self.write_batch(Method::POST, collection, entities).await
    }

    async fn update_entities(
        &self,
        collection: &str,
        entities: &[NewEntity],
    ) -> AppResult<BatchResponse> {
        self.write_batch(Method::PUT, collection, entities).await
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    data: &'a [NewEntity],
}

fn parse<T: DeserializeOwned>(body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|err| {
        AppError::TrackingTool(format!("failed to parse Octane response: {err}: {body}"))
    })
}
