mod client;
mod scope;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::services::{EntityScope, TrackingToolService};

pub use client::OctaneClient;
pub use scope::SharedSpace;

/// Signs in with the credentials configured for the requested shared space
/// and hands out workspace scopes. Each call gets its own cookie session;
/// the response cache is shared.
pub struct OctaneConnector {
    config: AppConfig,
    cache: Arc<ResponseCache>,
}

impl OctaneConnector {
    pub fn new(config: AppConfig, cache: Arc<ResponseCache>) -> Self {
        Self { config, cache }
    }

    pub async fn shared_space(&self, shared_space_id: u64) -> AppResult<SharedSpace> {
        let url = self.config.octane_url()?;
        let credentials = self.config.shared_space_credentials(shared_space_id)?;
        let client = OctaneClient::new(
            url,
            OctaneClient::private_api_headers(),
            Arc::clone(&self.cache),
        )?;
        debug!(base_url = client.base_url(), shared_space_id, "opening Octane shared space");
        client
            .sign_in(&credentials.user, &credentials.password)
            .await?;
        let shared_space = client.shared_space(shared_space_id);
        debug!(base_url = shared_space.base_url(), "signed in to Octane shared space");
        Ok(shared_space)
    }
}

#[async_trait]
impl TrackingToolService for OctaneConnector {
    async fn workspace(
        &self,
        shared_space_id: u64,
        workspace_id: u64,
    ) -> AppResult<Arc<dyn EntityScope>> {
        let shared_space = self.shared_space(shared_space_id).await?;
        let workspace = shared_space.workspace(workspace_id);
        debug!(base_url = workspace.base_url(), "using Octane workspace");
        Ok(Arc::new(workspace))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::entity::FetchParameters;
    use crate::error::AppError;

    fn config(url: &str) -> AppConfig {
        let vars: HashMap<&str, String> = HashMap::from([
            ("OCTANE_URL", url.to_string()),
            ("OCTANE_SHARED_SPACES", "1001".to_string()),
            ("OCTANE_USERS", "ci".to_string()),
            ("OCTANE_PASSWORDS", "pw".to_string()),
        ]);
        AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn signs_in_with_configured_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/sign_in"))
            .and(body_json(json!({ "user": "ci", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/shared_spaces/1001/workspaces/1002/defects"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "total_count": 0, "data": [] })),
            )
            .mount(&server)
            .await;

        let connector = OctaneConnector::new(config(&server.uri()), Arc::new(ResponseCache::new()));
        let workspace = connector.workspace(1001, 1002).await.unwrap();
        let defects = workspace
            .fetch_collection("defects", &FetchParameters::default())
            .await
            .unwrap();
        assert_eq!(defects.total_count, 0);
    }

    #[tokio::test]
    async fn failed_sign_in_is_tracking_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/sign_in"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let connector = OctaneConnector::new(config(&server.uri()), Arc::new(ResponseCache::new()));
        let err = connector.workspace(1001, 1002).await.err().unwrap();
        assert!(matches!(err, AppError::TrackingTool(_)));
    }

    #[tokio::test]
    async fn unknown_shared_space_is_configuration_error() {
        let connector = OctaneConnector::new(
            config("http://octane.invalid"),
            Arc::new(ResponseCache::new()),
        );
        let err = connector.workspace(9999, 1).await.err().unwrap();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
