use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{OAuthApp, PageOptions};
use crate::domain::branch::{Branch, BranchName};
use crate::domain::repository::ScmProviderKind;
use crate::domain::session::AccessCredential;
use crate::error::{AppError, AppResult};
use crate::infra::http;
use crate::services::ScmProvider;

const PROVIDER: &str = "GitHub Cloud";
const OAUTH_BASE_URL: &str = "https://github.com/login/oauth";

pub struct GithubCloudClient {
    http: Client,
    oauth: OAuthApp,
    oauth_base_url: String,
    paging: PageOptions,
}

impl GithubCloudClient {
    pub fn new(http: Client, oauth: OAuthApp, paging: PageOptions) -> Self {
        Self {
            http,
            oauth,
            oauth_base_url: OAUTH_BASE_URL.to_string(),
            paging,
        }
    }

    pub fn with_oauth_base_url(mut self, url: impl Into<String>) -> Self {
        self.oauth_base_url = url.into();
        self
    }

    fn auth_header(credential: &AccessCredential) -> String {
        format!("token {}", credential.token())
    }
}

#[async_trait]
impl ScmProvider for GithubCloudClient {
    fn kind(&self) -> ScmProviderKind {
        ScmProviderKind::GithubCloud
    }

    fn authorize_url(&self) -> AppResult<Option<String>> {
        let (client_id, _) = self.oauth.client_credentials(self.kind())?;
        let mut params = vec![("client_id", client_id)];
        if let Some(redirect_uri) = self.oauth.redirect_uri.as_deref() {
            params.push(("redirect_uri", redirect_uri));
        }
        params.push(("scope", "repo"));

        let url = url::Url::parse_with_params(&format!("{}/authorize", self.oauth_base_url), &params)
            .map_err(|err| AppError::Configuration(format!("invalid OAuth url: {err}")))?;
        Ok(Some(url.to_string()))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<AccessCredential> {
        info!("fetching GitHub Cloud access token");
        let (client_id, client_secret) = self.oauth.client_credentials(self.kind())?;
        let request = TokenRequest {
            client_id,
            client_secret,
            code,
        };

        let body = http::send(
            PROVIDER,
            self.http
                .post(format!("{}/access_token", self.oauth_base_url))
                .header(ACCEPT, "application/json")
                .json(&request),
        )
        .await?;

        // GitHub reports a bad code with 200 and an `error` field.
        let payload: TokenResponse = http::parse(PROVIDER, &body)?;
        payload
            .access_token
            .map(AccessCredential::OAuth)
            .ok_or_else(|| AppError::provider(PROVIDER, format!("no access token returned: {body}")))
    }

    async fn list_branches(
        &self,
        credential: &AccessCredential,
        api_url: &str,
    ) -> AppResult<Vec<Branch>> {
        info!(api_url, "listing GitHub Cloud branches");
        let url = format!("{}/branches", api_url.trim_end_matches('/'));
        let mut branches = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!(page, "fetching GitHub Cloud branch page");
            let body = http::send(
                PROVIDER,
                self.http
                    .get(&url)
                    .header(AUTHORIZATION, Self::auth_header(credential))
                    .header(ACCEPT, "application/vnd.github+json")
                    .query(&[("page", page), ("per_page", self.paging.page_size)]),
            )
            .await?;
            let values: Vec<GithubBranch> = http::parse(PROVIDER, &body)?;
            if values.is_empty() {
                break;
            }
            branches.extend(
                values
                    .into_iter()
                    .map(|branch| Branch::new(branch.commit.sha, branch.name)),
            );
            page += 1;
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
        info!(branch = %branch_name, sha = base, "creating GitHub Cloud branch");
        let git_ref = format!("refs/heads/{}", branch_name.as_str());
        let request = CreateRefRequest {
            git_ref: &git_ref,
            sha: base,
        };
        let body = http::send(
            PROVIDER,
            self.http
                .post(format!("{}/git/refs", api_url.trim_end_matches('/')))
                .header(AUTHORIZATION, Self::auth_header(credential))
                .header(CONTENT_TYPE, "application/json")
                .json(&request),
        )
        .await?;
        http::parse(PROVIDER, &body)
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct GithubBranch {
    name: String,
    commit: GithubCommit,
}

#[derive(Deserialize)]
struct GithubCommit {
    sha: String,
}

#[derive(Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    sha: &'a str,
}
