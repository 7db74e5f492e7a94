use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

// protocol://[user@]host/namespace/repo.git
static HOSTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https|http)://(?:([^@/]+)@)?([^/@]+)/([^/]+)/([^/]+)\.git$")
        .expect("invalid hosted repository url regex")
});

static BITBUCKET_SERVER_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https|http)://(?:([^@/]+)@)?([^/@]+)/scm/([^/]+)/([^/]+)\.git$")
        .expect("invalid Bitbucket Server url regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScmProviderKind {
    BitbucketCloud,
    BitbucketServer,
    GithubCloud,
}

impl ScmProviderKind {
    pub const ALL: [ScmProviderKind; 3] = [
        ScmProviderKind::BitbucketCloud,
        ScmProviderKind::BitbucketServer,
        ScmProviderKind::GithubCloud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScmProviderKind::BitbucketCloud => "Bitbucket Cloud",
            ScmProviderKind::BitbucketServer => "Bitbucket Server",
            ScmProviderKind::GithubCloud => "GitHub Cloud",
        }
    }

    pub fn example_url(&self) -> &'static str {
        match self {
            ScmProviderKind::BitbucketCloud => "https://user@bitbucket.org/workspace/repo.git",
            ScmProviderKind::BitbucketServer => {
                "https://bitbucket.example.com:7990/scm/PROJECT/repo.git"
            }
            ScmProviderKind::GithubCloud => "https://github.com/MyUser/MyRepo.git",
        }
    }

    fn url_regex(&self) -> &'static Regex {
        match self {
            ScmProviderKind::BitbucketCloud | ScmProviderKind::GithubCloud => &HOSTED_URL,
            ScmProviderKind::BitbucketServer => &BITBUCKET_SERVER_URL,
        }
    }
}

impl fmt::Display for ScmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pieces of a clone URL needed to address the provider's REST API.
/// `namespace` is the workspace (Bitbucket Cloud), project key (Bitbucket
/// Server) or owner (GitHub).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    pub provider: ScmProviderKind,
    pub protocol: String,
    pub username: Option<String>,
    pub host: String,
    pub namespace: String,
    pub repo_name: String,
}

impl RepositoryReference {
    pub fn parse(provider: ScmProviderKind, clone_url: &str) -> AppResult<Self> {
        let invalid = || AppError::InvalidRepositoryUrl {
            url: clone_url.to_string(),
            example: provider.example_url(),
        };
        let captures = provider
            .url_regex()
            .captures(clone_url.trim())
            .ok_or_else(invalid)?;

        Ok(Self {
            provider,
            protocol: captures[1].to_string(),
            username: captures.get(2).map(|m| m.as_str().to_string()),
            host: captures[3].to_string(),
            namespace: captures[4].to_string(),
            repo_name: captures[5].to_string(),
        })
    }

    pub fn api_url(&self) -> String {
        let Self {
            protocol,
            host,
            namespace,
            repo_name,
            ..
        } = self;
        match self.provider {
            ScmProviderKind::BitbucketCloud => {
                format!("{protocol}://api.{host}/2.0/repositories/{namespace}/{repo_name}")
            }
            ScmProviderKind::BitbucketServer => {
                format!("{protocol}://{host}/rest/api/1.0/projects/{namespace}/repos/{repo_name}")
            }
            ScmProviderKind::GithubCloud => {
                format!("{protocol}://api.{host}/repos/{namespace}/{repo_name}")
            }
        }
    }
}

pub fn api_url_for(provider: ScmProviderKind, clone_url: &str) -> AppResult<String> {
    RepositoryReference::parse(provider, clone_url).map(|reference| reference.api_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disassembles_bitbucket_cloud_url_with_user() {
        let reference = RepositoryReference::parse(
            ScmProviderKind::BitbucketCloud,
            "https://jdoe@bitbucket.org/acme/widgets.git",
        )
        .unwrap();
        assert_eq!(reference.username.as_deref(), Some("jdoe"));
        assert_eq!(reference.host, "bitbucket.org");
        assert_eq!(reference.namespace, "acme");
        assert_eq!(reference.repo_name, "widgets");
        assert_eq!(
            reference.api_url(),
            "https://api.bitbucket.org/2.0/repositories/acme/widgets"
        );
    }

    #[test]
    fn builds_bitbucket_server_api_url() {
        let url = api_url_for(
            ScmProviderKind::BitbucketServer,
            "http://git.corp.local:7990/scm/PLAT/core-api.git",
        )
        .unwrap();
        assert_eq!(
            url,
            "http://git.corp.local:7990/rest/api/1.0/projects/PLAT/repos/core-api"
        );
    }

    #[test]
    fn builds_github_api_url() {
        let url = api_url_for(
            ScmProviderKind::GithubCloud,
            "https://github.com/MyUser/MyRepo.git",
        )
        .unwrap();
        assert_eq!(url, "https://api.github.com/repos/MyUser/MyRepo");
    }

    #[test]
    fn disassembly_is_deterministic() {
        let url = "https://github.com/octo/hello.git";
        let first = api_url_for(ScmProviderKind::GithubCloud, url).unwrap();
        let second = api_url_for(ScmProviderKind::GithubCloud, url).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_server_url_without_scm_segment() {
        let err = RepositoryReference::parse(
            ScmProviderKind::BitbucketServer,
            "https://git.corp.local/PLAT/core-api.git",
        )
        .unwrap_err();
        match err {
            AppError::InvalidRepositoryUrl { url, example } => {
                assert_eq!(url, "https://git.corp.local/PLAT/core-api.git");
                assert!(example.contains("/scm/"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_urls() {
        for url in [
            "",
            "github.com/octo/hello.git",
            "ssh://git@github.com/octo/hello.git",
            "https://github.com/octo/hello",
            "https://github.com/octo/nested/hello.git",
        ] {
            assert!(
                matches!(
                    RepositoryReference::parse(ScmProviderKind::GithubCloud, url),
                    Err(AppError::InvalidRepositoryUrl { .. })
                ),
                "{url} should be rejected"
            );
        }
    }
}
