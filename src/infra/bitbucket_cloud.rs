use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
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

const PROVIDER: &str = "Bitbucket Cloud";
const OAUTH_BASE_URL: &str = "https://bitbucket.org/site/oauth2";

pub struct BitbucketCloudClient {
    http: Client,
    oauth: OAuthApp,
    oauth_base_url: String,
    paging: PageOptions,
}

impl BitbucketCloudClient {
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

    fn first_page_url(&self, api_url: &str) -> AppResult<String> {
        let page_size = self.paging.page_size.to_string();
        let mut params = vec![("pagelen", page_size.as_str())];
        if let Some(sort) = &self.paging.order {
            params.push(("sort", sort.as_str()));
        }
        let url = url::Url::parse_with_params(
            &format!("{}/refs/branches", api_url.trim_end_matches('/')),
            &params,
        )
        .map_err(|err| AppError::provider(PROVIDER, format!("invalid api url {api_url}: {err}")))?;
        Ok(url.to_string())
    }

    fn bearer(credential: &AccessCredential) -> String {
        format!("Bearer {}", credential.token())
    }
}

#[async_trait]
impl ScmProvider for BitbucketCloudClient {
    fn kind(&self) -> ScmProviderKind {
        ScmProviderKind::BitbucketCloud
    }

    fn authorize_url(&self) -> AppResult<Option<String>> {
        let (client_id, _) = self.oauth.client_credentials(self.kind())?;
        let url = url::Url::parse_with_params(
            &format!("{}/authorize", self.oauth_base_url),
            &[("client_id", client_id), ("response_type", "code")],
        )
        .map_err(|err| AppError::Configuration(format!("invalid OAuth url: {err}")))?;
        Ok(Some(url.to_string()))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<AccessCredential> {
        info!("fetching Bitbucket Cloud access token");
        let (client_id, client_secret) = self.oauth.client_credentials(self.kind())?;
        let encoded = BASE64_STANDARD.encode(format!("{client_id}:{client_secret}"));

        let body = http::send(
            PROVIDER,
            self.http
                .post(format!("{}/access_token", self.oauth_base_url))
                .header(AUTHORIZATION, format!("Basic {encoded}"))
                .form(&[("grant_type", "authorization_code"), ("code", code)]),
        )
        .await?;

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
        info!(api_url, "listing Bitbucket Cloud branches");
        let mut branches = Vec::new();
        let mut next = Some(self.first_page_url(api_url)?);

        while let Some(page_url) = next {
            debug!(url = %page_url, "fetching Bitbucket Cloud branch page");
            let body = http::send(
                PROVIDER,
                self.http
                    .get(&page_url)
                    .header(AUTHORIZATION, Self::bearer(credential)),
            )
            .await?;
            let page: BranchPage = http::parse(PROVIDER, &body)?;
            let values = page
                .values
                .ok_or_else(|| AppError::provider(PROVIDER, format!("no branches returned: {body}")))?;

            branches.extend(
                values
                    .into_iter()
                    .map(|branch| Branch::new(branch.target.hash, branch.name)),
            );
            next = page.next.filter(|next| !next.is_empty());
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
        info!(branch = %branch_name, "creating Bitbucket Cloud branch");
        let request = CreateBranchRequest {
            name: branch_name.as_str(),
            target: Target { hash: base },
        };
        let body = http::send(
            PROVIDER,
            self.http
                .post(format!("{}/refs/branches", api_url.trim_end_matches('/')))
                .header(AUTHORIZATION, Self::bearer(credential))
                .header(CONTENT_TYPE, "application/json")
                .json(&request),
        )
        .await?;
        http::parse(PROVIDER, &body)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct BranchPage {
    values: Option<Vec<CloudBranch>>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct CloudBranch {
    name: String,
    target: CloudCommit,
}

#[derive(Deserialize)]
struct CloudCommit {
    hash: String,
}

#[derive(Serialize)]
struct CreateBranchRequest<'a> {
    name: &'a str,
    target: Target<'a>,
}

#[derive(Serialize)]
struct Target<'a> {
    hash: &'a str,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(paging: PageOptions) -> BitbucketCloudClient {
        BitbucketCloudClient::new(
            Client::new(),
            OAuthApp {
                client_id: Some("id".into()),
                client_secret: Some("secret".into()),
                redirect_uri: None,
            },
            paging,
        )
    }

    fn paging() -> PageOptions {
        PageOptions {
            page_size: 2,
            order: Some("-target.date".into()),
        }
    }

    fn token() -> AccessCredential {
        AccessCredential::OAuth("tok".into())
    }

    #[tokio::test]
    async fn follows_next_links_in_order() {
        let server = MockServer::start().await;
        let api_url = format!("{}/2.0/repositories/acme/widgets", server.uri());

        Mock::given(method("GET"))
            .and(path("/2.0/repositories/acme/widgets/refs/branches"))
            .and(query_param("pagelen", "2"))
            .and(query_param("sort", "-target.date"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [
                    { "name": "main", "target": { "hash": "aaa" } },
                    { "name": "dev", "target": { "hash": "bbb" } }
                ],
                "next": format!("{}/page-2", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{ "name": "release", "target": { "hash": "ccc" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let branches = client(paging()).list_branches(&token(), &api_url).await.unwrap();
        assert_eq!(
            branches,
            vec![
                Branch::new("aaa", "main"),
                Branch::new("bbb", "dev"),
                Branch::new("ccc", "release"),
            ]
        );
    }

    #[tokio::test]
    async fn stops_after_single_page_without_next() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refs/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{ "name": "main", "target": { "hash": "aaa" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let branches = client(paging())
            .list_branches(&token(), &server.uri())
            .await
            .unwrap();
        assert_eq!(branches.len(), 1);
    }

    #[tokio::test]
    async fn empty_next_link_ends_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refs/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{ "name": "main", "target": { "hash": "aaa" } }],
                "next": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let branches = client(paging())
            .list_branches(&token(), &server.uri())
            .await
            .unwrap();
        assert_eq!(branches, vec![Branch::new("aaa", "main")]);
    }

    #[tokio::test]
    async fn sort_value_is_query_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refs/branches"))
            .and(query_param("pagelen", "2"))
            .and(query_param("sort", "-target.date&x=1#frag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{ "name": "main", "target": { "hash": "aaa" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let odd_sort = PageOptions {
            page_size: 2,
            order: Some("-target.date&x=1#frag".into()),
        };
        let branches = client(odd_sort)
            .list_branches(&token(), &server.uri())
            .await
            .unwrap();
        assert_eq!(branches.len(), 1);
    }

    #[tokio::test]
    async fn empty_repository_is_no_branches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refs/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": [] })))
            .mount(&server)
            .await;

        let err = client(paging())
            .list_branches(&token(), &server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoBranches { .. }));
    }

    #[tokio::test]
    async fn missing_values_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refs/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "size": 0 })))
            .mount(&server)
            .await;

        let err = client(paging())
            .list_branches(&token(), &server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProviderRequest { .. }));
    }

    #[tokio::test]
    async fn create_surfaces_raw_body_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refs/branches"))
            .and(body_json(json!({ "name": "us_1-x", "target": { "hash": "aaa" } })))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":{"message":"exists"}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(paging())
            .create_branch(&token(), &server.uri(), &BranchName("us_1-x".into()), "aaa")
            .await
            .unwrap_err();
        match err {
            AppError::ProviderRequest { message, .. } => {
                assert!(message.contains(r#"{"error":{"message":"exists"}}"#));
                assert!(message.contains("400"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchanges_code_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/access_token"))
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "fresh" })),
            )
            .mount(&server)
            .await;

        let credential = client(paging())
            .with_oauth_base_url(server.uri())
            .exchange_code("abc")
            .await
            .unwrap();
        assert_eq!(credential, AccessCredential::OAuth("fresh".into()));
    }

    #[test]
    fn authorize_url_carries_client_id() {
        let url = client(paging()).authorize_url().unwrap().unwrap();
        assert_eq!(
            url,
            "https://bitbucket.org/site/oauth2/authorize?client_id=id&response_type=code"
        );
    }
}
