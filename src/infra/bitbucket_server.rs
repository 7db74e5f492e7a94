use async_trait::async_trait;
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PageOptions;
use crate::domain::branch::{Branch, BranchName};
use crate::domain::repository::ScmProviderKind;
use crate::domain::session::AccessCredential;
use crate::error::{AppError, AppResult};
use crate::infra::http;
use crate::services::ScmProvider;

const PROVIDER: &str = "Bitbucket Server";

/// Self-hosted Bitbucket. Authenticates with a personal access token from
/// configuration instead of OAuth.
pub struct BitbucketServerClient {
    http: Client,
    token: Option<String>,
    paging: PageOptions,
}

impl BitbucketServerClient {
    pub fn new(http: Client, token: Option<String>, paging: PageOptions) -> Self {
        Self {
            http,
            token,
            paging,
        }
    }

    async fn fetch_page(
        &self,
        credential: &AccessCredential,
        api_url: &str,
        start: u64,
    ) -> AppResult<ServerPage> {
        debug!(start, "fetching Bitbucket Server branch page");
        let mut query = vec![
            ("limit", self.paging.page_size.to_string()),
            ("start", start.to_string()),
        ];
        if let Some(order) = &self.paging.order {
            query.push(("orderBy", order.clone()));
        }

        let body = http::send(
            PROVIDER,
            self.http
                .get(format!("{}/branches", api_url.trim_end_matches('/')))
                .header(AUTHORIZATION, format!("Bearer {}", credential.token()))
                .query(&query),
        )
        .await?;
        let envelope: ServerEnvelope = http::parse(PROVIDER, &body)?;
        ServerPage::from_envelope(envelope, &body)
    }
}

#[async_trait]
impl ScmProvider for BitbucketServerClient {
    fn kind(&self) -> ScmProviderKind {
        ScmProviderKind::BitbucketServer
    }

    fn authorize_url(&self) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn exchange_code(&self, _code: &str) -> AppResult<AccessCredential> {
        Err(AppError::Configuration(
            "Bitbucket Server uses a personal access token, not OAuth".to_string(),
        ))
    }

    fn configured_credential(&self) -> Option<AccessCredential> {
        self.token
            .clone()
            .map(AccessCredential::PersonalAccessToken)
    }

    async fn list_branches(
        &self,
        credential: &AccessCredential,
        api_url: &str,
    ) -> AppResult<Vec<Branch>> {
        info!(api_url, "listing Bitbucket Server branches");
        let mut branches = Vec::new();
        let mut start = 0;

        loop {
            let page = self.fetch_page(credential, api_url, start).await?;
            branches.extend(page.values);
            match page.next_page_start {
                Some(next) => start = next,
                None => break,
            }
        }

        if branches.is_empty() {
            return Err(AppError::NoBranches {
                provider: PROVIDER,
                api_url: api_url.to_string(),
            });
        }
        Ok(branches)
    }

    async fn create_branch(
        &self,
        credential: &AccessCredential,
        api_url: &str,
        branch_name: &BranchName,
        base: &str,
    ) -> AppResult<Value> {
        info!(branch = %branch_name, "creating Bitbucket Server branch");
        let request = CreateBranchRequest {
            name: branch_name.as_str(),
            start_point: base,
        };
        let body = http::send(
            PROVIDER,
            self.http
                .post(format!("{}/branches", api_url.trim_end_matches('/')))
                .header(AUTHORIZATION, format!("Bearer {}", credential.token()))
                .header(CONTENT_TYPE, "application/json")
                .json(&request),
        )
        .await?;
        http::parse(PROVIDER, &body)
    }
}

#[derive(Deserialize)]
struct ServerEnvelope {
    values: Option<Vec<ServerBranch>>,
    #[serde(rename = "isLastPage")]
    is_last_page: Option<bool>,
    #[serde(rename = "nextPageStart")]
    next_page_start: Option<u64>,
}

#[derive(Deserialize)]
struct ServerBranch {
    id: String,
    #[serde(rename = "displayId")]
    display_id: String,
}

/// A validated page: `next_page_start` is `Some` exactly when more pages
/// follow.
struct ServerPage {
    values: Vec<Branch>,
    next_page_start: Option<u64>,
}

impl ServerPage {
    fn from_envelope(envelope: ServerEnvelope, body: &str) -> AppResult<Self> {
        let malformed = |field: &str| {
            AppError::provider(
                PROVIDER,
                format!("error while getting the branches, no '{field}' value returned: {body}"),
            )
        };

        let values = envelope.values.ok_or_else(|| malformed("values"))?;
        let is_last_page = envelope.is_last_page.ok_or_else(|| malformed("isLastPage"))?;
        let next_page_start = if is_last_page {
            None
        } else {
            Some(
                envelope
                    .next_page_start
                    .ok_or_else(|| malformed("nextPageStart"))?,
            )
        };

        Ok(Self {
            values: values
                .into_iter()
                .map(|branch| Branch::new(branch.id, branch.display_id))
                .collect(),
            next_page_start,
        })
    }
}

#[derive(Serialize)]
struct CreateBranchRequest<'a> {
    name: &'a str,
    #[serde(rename = "startPoint")]
    start_point: &'a str,
}
