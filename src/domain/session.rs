use std::fmt;

use crate::domain::branch::BranchName;
use crate::domain::repository::{ScmProviderKind, api_url_for};
use crate::domain::work_item::WorkItem;
use crate::error::AppResult;

#[derive(Clone, PartialEq, Eq)]
pub enum AccessCredential {
    OAuth(String),
    PersonalAccessToken(String),
}

impl AccessCredential {
    pub fn token(&self) -> &str {
        match self {
            AccessCredential::OAuth(token) | AccessCredential::PersonalAccessToken(token) => token,
        }
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessCredential::OAuth(_) => f.write_str("OAuth(****)"),
            AccessCredential::PersonalAccessToken(_) => f.write_str("PersonalAccessToken(****)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRepository {
    pub provider: ScmProviderKind,
    pub clone_url: String,
    pub api_url: String,
}

impl SelectedRepository {
    pub fn new(provider: ScmProviderKind, clone_url: &str) -> AppResult<Self> {
        let api_url = api_url_for(provider, clone_url)?;
        Ok(Self {
            provider,
            clone_url: clone_url.to_string(),
            api_url,
        })
    }
}

/// State carried from repository selection through branch creation and
/// linking. One per user flow; nothing in it is shared.
#[derive(Debug, Clone)]
pub struct BranchSession {
    pub work_item: WorkItem,
    pub repository: SelectedRepository,
    pub branch_name: BranchName,
    pub credential: Option<AccessCredential>,
}

impl BranchSession {
    pub fn new(work_item: WorkItem, repository: SelectedRepository, branch_name: BranchName) -> Self {
        Self {
            work_item,
            repository,
            branch_name,
            credential: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_hides_token() {
        let credential = AccessCredential::OAuth("super-secret".to_string());
        assert_eq!(format!("{credential:?}"), "OAuth(****)");
        assert_eq!(credential.token(), "super-secret");
    }

    #[test]
    fn selected_repository_resolves_api_url() {
        let repository =
            SelectedRepository::new(ScmProviderKind::GithubCloud, "https://github.com/octo/hello.git")
                .unwrap();
        assert_eq!(repository.api_url, "https://api.github.com/repos/octo/hello");
    }
}
