use std::env;

use crate::domain::repository::ScmProviderKind;
use crate::error::{AppError, AppResult};

const DEFAULT_BITBUCKET_CLOUD_PAGE_SIZE: u32 = 100;
const DEFAULT_BITBUCKET_SERVER_PAGE_SIZE: u32 = 1000;
const DEFAULT_GITHUB_CLOUD_PAGE_SIZE: u32 = 100;
const DEFAULT_BITBUCKET_CLOUD_SORT: &str = "-target.date";
const DEFAULT_BITBUCKET_SERVER_ORDER: &str = "MODIFICATION";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub octane: OctaneSettings,
    pub github_cloud: OAuthApp,
    pub bitbucket_cloud: OAuthApp,
    pub bitbucket_server_token: Option<String>,
    pub repositories: RepositoryAllowList,
    pub paging: PagingSettings,
}

#[derive(Debug, Clone, Default)]
pub struct OctaneSettings {
    pub url: Option<String>,
    pub shared_spaces: Vec<SharedSpaceCredentials>,
    pub supports_branches: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SharedSpaceCredentials {
    pub id: u64,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for SharedSpaceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSpaceCredentials")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OAuthApp {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl OAuthApp {
    pub fn client_credentials(&self, provider: ScmProviderKind) -> AppResult<(&str, &str)> {
        let id = self.client_id.as_deref().ok_or_else(|| {
            AppError::Configuration(format!("{provider} OAuth client id not configured"))
        })?;
        let secret = self.client_secret.as_deref().ok_or_else(|| {
            AppError::Configuration(format!("{provider} OAuth client secret not configured"))
        })?;
        Ok((id, secret))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RepositoryAllowList {
    pub bitbucket_cloud: Vec<String>,
    pub bitbucket_server: Vec<String>,
    pub github_cloud: Vec<String>,
}

impl RepositoryAllowList {
    pub fn for_provider(&self, provider: ScmProviderKind) -> &[String] {
        match provider {
            ScmProviderKind::BitbucketCloud => &self.bitbucket_cloud,
            ScmProviderKind::BitbucketServer => &self.bitbucket_server,
            ScmProviderKind::GithubCloud => &self.github_cloud,
        }
    }

    pub fn provider_of(&self, clone_url: &str) -> Option<ScmProviderKind> {
        let clone_url = clone_url.trim();
        ScmProviderKind::ALL
            .into_iter()
            .find(|provider| self.for_provider(*provider).iter().any(|url| url == clone_url))
    }

    pub fn is_empty(&self) -> bool {
        ScmProviderKind::ALL
            .iter()
            .all(|provider| self.for_provider(*provider).is_empty())
    }
}

/// Page size and ordering used when listing branches. The defaults are the
/// values the deployment has been running with, not tuned limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    pub page_size: u32,
    pub order: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PagingSettings {
    pub bitbucket_cloud: PageOptions,
    pub bitbucket_server: PageOptions,
    pub github_cloud: PageOptions,
}

impl Default for PagingSettings {
    fn default() -> Self {
        Self {
            bitbucket_cloud: PageOptions {
                page_size: DEFAULT_BITBUCKET_CLOUD_PAGE_SIZE,
                order: Some(DEFAULT_BITBUCKET_CLOUD_SORT.to_string()),
            },
            bitbucket_server: PageOptions {
                page_size: DEFAULT_BITBUCKET_SERVER_PAGE_SIZE,
                order: Some(DEFAULT_BITBUCKET_SERVER_ORDER.to_string()),
            },
            github_cloud: PageOptions {
                page_size: DEFAULT_GITHUB_CLOUD_PAGE_SIZE,
                order: None,
            },
        }
    }
}

impl PagingSettings {
    pub fn for_provider(&self, provider: ScmProviderKind) -> &PageOptions {
        match provider {
            ScmProviderKind::BitbucketCloud => &self.bitbucket_cloud,
            ScmProviderKind::BitbucketServer => &self.bitbucket_server,
            ScmProviderKind::GithubCloud => &self.github_cloud,
        }
    }
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let list = |key: &str| value(key).map(|v| split_and_trim(&v)).unwrap_or_default();

        let shared_space_ids = list("OCTANE_SHARED_SPACES");
        let users = list("OCTANE_USERS");
        let passwords = list("OCTANE_PASSWORDS");
        let mut shared_spaces = Vec::with_capacity(shared_space_ids.len());
        for (index, raw_id) in shared_space_ids.iter().enumerate() {
            let id = raw_id.parse::<u64>().map_err(|_| {
                AppError::Configuration(format!("invalid shared space id '{raw_id}'"))
            })?;
            if let (Some(user), Some(password)) = (users.get(index), passwords.get(index)) {
                shared_spaces.push(SharedSpaceCredentials {
                    id,
                    user: user.clone(),
                    password: password.clone(),
                });
            }
        }

        let defaults = PagingSettings::default();
        let page_size = |key: &str, fallback: u32| {
            value(key)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|size| *size > 0)
                .unwrap_or(fallback)
        };

        Ok(Self {
            octane: OctaneSettings {
                url: value("OCTANE_URL"),
                shared_spaces,
                supports_branches: value("DOES_OCTANE_SUPPORT_BRANCHES").as_deref() == Some("true"),
            },
            github_cloud: OAuthApp {
                client_id: value("GITHUB_CLOUD_CLIENT_ID"),
                client_secret: value("GITHUB_CLOUD_CLIENT_SECRET"),
                redirect_uri: value("GITHUB_CLOUD_REDIRECT_URI"),
            },
            bitbucket_cloud: OAuthApp {
                client_id: value("BITBUCKET_CLOUD_CLIENT_ID"),
                client_secret: value("BITBUCKET_CLOUD_CLIENT_SECRET"),
                redirect_uri: None,
            },
            bitbucket_server_token: value("BITBUCKET_SERVER_PERSONAL_ACCESS_TOKEN"),
            repositories: RepositoryAllowList {
                bitbucket_cloud: list("BITBUCKET_CLOUD_REPOSITORIES"),
                bitbucket_server: list("BITBUCKET_SERVER_REPOSITORIES"),
                github_cloud: list("GITHUB_CLOUD_REPOSITORIES"),
            },
            paging: PagingSettings {
                bitbucket_cloud: PageOptions {
                    page_size: page_size(
                        "BITBUCKET_CLOUD_GET_LIMIT",
                        defaults.bitbucket_cloud.page_size,
                    ),
                    order: value("BITBUCKET_CLOUD_BRANCH_SORT").or(defaults.bitbucket_cloud.order),
                },
                bitbucket_server: PageOptions {
                    page_size: page_size(
                        "BITBUCKET_SERVER_GET_LIMIT",
                        defaults.bitbucket_server.page_size,
                    ),
                    order: value("BITBUCKET_SERVER_BRANCH_ORDER")
                        .or(defaults.bitbucket_server.order),
                },
                github_cloud: PageOptions {
                    page_size: page_size("GITHUB_CLOUD_GET_LIMIT", defaults.github_cloud.page_size),
                    order: None,
                },
            },
        })
    }

    pub fn octane_url(&self) -> AppResult<&str> {
        self.octane
            .url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("OCTANE_URL not configured".to_string()))
    }

    pub fn shared_space_credentials(&self, shared_space_id: u64) -> AppResult<&SharedSpaceCredentials> {
        self.octane
            .shared_spaces
            .iter()
            .find(|space| space.id == shared_space_id)
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "no credentials configured for shared space {shared_space_id}"
                ))
            })
    }

    pub fn oauth_app(&self, provider: ScmProviderKind) -> Option<&OAuthApp> {
        match provider {
            ScmProviderKind::BitbucketCloud => Some(&self.bitbucket_cloud),
            ScmProviderKind::GithubCloud => Some(&self.github_cloud),
            ScmProviderKind::BitbucketServer => None,
        }
    }
}

fn split_and_trim(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
