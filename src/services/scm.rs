use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::branch::{Branch, BranchName};
use crate::domain::repository::ScmProviderKind;
use crate::domain::session::AccessCredential;
use crate::error::{AppError, AppResult};

/// One source-control host. Listing walks every page the host reports and
/// fails with `NoBranches` when the repository is empty; creation is a
/// single attempt with the host's own conflict behavior passed through.
#[async_trait]
pub trait ScmProvider: Send + Sync {
    fn kind(&self) -> ScmProviderKind;

    /// Where the user grants access, for hosts that use OAuth.
    fn authorize_url(&self) -> AppResult<Option<String>>;

    async fn exchange_code(&self, code: &str) -> AppResult<AccessCredential>;

    /// Credential that needs no user interaction, if the host is set up
    /// with one.
    fn configured_credential(&self) -> Option<AccessCredential> {
        None
    }

    async fn list_branches(
        &self,
        credential: &AccessCredential,
        api_url: &str,
    ) -> AppResult<Vec<Branch>>;

    async fn create_branch(
        &self,
        credential: &AccessCredential,
        api_url: &str,
        branch_name: &BranchName,
        base: &str,
    ) -> AppResult<Value>;
}

#[derive(Clone, Default)]
pub struct ScmProviders {
    providers: HashMap<ScmProviderKind, Arc<dyn ScmProvider>>,
}

impl ScmProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: Arc<dyn ScmProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ScmProviderKind) -> AppResult<Arc<dyn ScmProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::Configuration(format!("{kind} provider is not available")))
    }
}
