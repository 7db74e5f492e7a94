use serde_json::Value;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::domain::branch::{Branch, BranchName};
use crate::domain::entity::BatchResponse;
use crate::domain::repository::ScmProviderKind;
use crate::domain::session::{AccessCredential, BranchSession, SelectedRepository};
use crate::domain::work_item::WorkItem;
use crate::error::{AppError, AppResult};
use crate::workflow::tracking::{create_branch_and_link, fetch_branch_patterns};

/// Ways the user can hand over access to the provider. The first one set
/// wins; with none set the provider's configured credential is used.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    pub code: Option<String>,
    pub token: Option<String>,
}

/// How the branch name is chosen. An explicit `branch` wins over any
/// pattern; `pattern` picks one of the tracking tool's patterns by its
/// text or by 1-based position.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameSelection<'a> {
    pub branch: Option<&'a str>,
    pub pattern: Option<&'a str>,
}

pub struct BranchOutcome {
    pub session: BranchSession,
    pub created: Value,
    pub link: Option<BatchResponse>,
}

pub fn select_repository(ctx: &AppContext, clone_url: &str) -> AppResult<SelectedRepository> {
    let clone_url = clone_url.trim();
    let provider = ctx.config.repositories.provider_of(clone_url).ok_or_else(|| {
        AppError::Configuration(format!("repository {clone_url} is not configured"))
    })?;
    SelectedRepository::new(provider, clone_url)
}

/// Empty when the tracking tool has no branch support.
pub async fn branch_patterns(
    ctx: &AppContext,
    shared_space_id: u64,
    workspace_id: u64,
    entity_type: &str,
) -> AppResult<Vec<String>> {
    if !ctx.config.octane.supports_branches {
        return Ok(Vec::new());
    }
    let scope = ctx
        .tracking_tool
        .workspace(shared_space_id, workspace_id)
        .await?;
    fetch_branch_patterns(scope.as_ref(), entity_type).await
}

pub async fn resolve_branch_name(
    ctx: &AppContext,
    work_item: &WorkItem,
    selection: NameSelection<'_>,
) -> AppResult<BranchName> {
    if let Some(name) = selection.branch.map(str::trim).filter(|name| !name.is_empty()) {
        return Ok(BranchName(name.to_string()));
    }

    let patterns = branch_patterns(
        ctx,
        work_item.shared_space_id,
        work_item.workspace_id,
        work_item.pattern_entity_type(),
    )
    .await?;
    let pattern = pick_pattern(&patterns, selection.pattern)?;
    Ok(BranchName::from_pattern(
        pattern,
        work_item.id,
        &work_item.name,
        work_item.pattern_entity_type(),
    ))
}

/// Without a selection the first pattern is used. A selection must name
/// one of `patterns`, either verbatim or by 1-based position.
pub fn pick_pattern<'a>(
    patterns: &'a [String],
    selection: Option<&str>,
) -> AppResult<Option<&'a str>> {
    let Some(selection) = selection.map(str::trim) else {
        if patterns.len() > 1 {
            warn!(count = patterns.len(), "several branch patterns configured, using the first");
        }
        return Ok(patterns.first().map(String::as_str));
    };

    patterns
        .iter()
        .find(|pattern| pattern.as_str() == selection)
        .or_else(|| {
            selection
                .parse::<usize>()
                .ok()
                .and_then(|position| position.checked_sub(1))
                .and_then(|index| patterns.get(index))
        })
        .map(|pattern| Some(pattern.as_str()))
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "branch pattern '{selection}' is not one of the {} configured patterns",
                patterns.len()
            ))
        })
}

pub async fn start_session(
    ctx: &AppContext,
    work_item: WorkItem,
    clone_url: &str,
    selection: NameSelection<'_>,
) -> AppResult<BranchSession> {
    let repository = select_repository(ctx, clone_url)?;
    let branch_name = resolve_branch_name(ctx, &work_item, selection).await?;
    Ok(BranchSession::new(work_item, repository, branch_name))
}

pub fn authorize_url(ctx: &AppContext, provider: ScmProviderKind) -> AppResult<Option<String>> {
    ctx.providers.get(provider)?.authorize_url()
}

pub async fn resolve_credential(
    ctx: &AppContext,
    provider: ScmProviderKind,
    source: &CredentialSource,
) -> AppResult<AccessCredential> {
    if let Some(token) = &source.token {
        return Ok(match provider {
            ScmProviderKind::BitbucketServer => AccessCredential::PersonalAccessToken(token.clone()),
            _ => AccessCredential::OAuth(token.clone()),
        });
    }

    let scm = ctx.providers.get(provider)?;
    if let Some(code) = &source.code {
        return scm.exchange_code(code).await;
    }
    scm.configured_credential().ok_or_else(|| {
        AppError::Configuration(format!(
            "no {provider} credential available; pass an authorization code or a token"
        ))
    })
}

/// The token worth handing back to the user: one obtained by exchanging a
/// single-use authorization code, which cannot be exchanged again.
pub fn reusable_token<'a>(
    source: &CredentialSource,
    credential: &'a AccessCredential,
) -> Option<&'a str> {
    match (&source.token, &source.code) {
        (None, Some(_)) => Some(credential.token()),
        _ => None,
    }
}

pub async fn authenticate(
    ctx: &AppContext,
    session: &mut BranchSession,
    source: &CredentialSource,
) -> AppResult<()> {
    let credential = resolve_credential(ctx, session.repository.provider, source).await?;
    session.credential = Some(credential);
    Ok(())
}

pub async fn list_branches(
    ctx: &AppContext,
    repository: &SelectedRepository,
    credential: &AccessCredential,
) -> AppResult<Vec<Branch>> {
    ctx.providers
        .get(repository.provider)?
        .list_branches(credential, &repository.api_url)
        .await
}

pub async fn list_base_branches(ctx: &AppContext, session: &BranchSession) -> AppResult<Vec<Branch>> {
    list_branches(ctx, &session.repository, session_credential(session)?).await
}

/// Finds the base branch by identifier or by display name.
pub fn find_base<'a>(branches: &'a [Branch], base: &str) -> AppResult<&'a Branch> {
    branches
        .iter()
        .find(|branch| branch.id == base)
        .or_else(|| branches.iter().find(|branch| branch.display_name == base))
        .ok_or_else(|| AppError::Configuration(format!("base branch '{base}' not found")))
}

/// Creates the branch at the provider, then records and links it in the
/// tracking tool when branch support is enabled.
pub async fn create_branch(
    ctx: &AppContext,
    session: BranchSession,
    base: &str,
) -> AppResult<BranchOutcome> {
    let credential = session_credential(&session)?;
    let repository = &session.repository;
    let created = ctx
        .providers
        .get(repository.provider)?
        .create_branch(credential, &repository.api_url, &session.branch_name, base)
        .await?;
    info!(branch = %session.branch_name, provider = %repository.provider, "branch created");

    let link = if ctx.config.octane.supports_branches {
        let work_item = &session.work_item;
        let scope = ctx
            .tracking_tool
            .workspace(work_item.shared_space_id, work_item.workspace_id)
            .await?;
        Some(
            create_branch_and_link(
                scope.as_ref(),
                work_item.id,
                &session.branch_name,
                &repository.clone_url,
            )
            .await?,
        )
    } else {
        None
    };

    Ok(BranchOutcome {
        session,
        created,
        link,
    })
}

fn session_credential(session: &BranchSession) -> AppResult<&AccessCredential> {
    session.credential.as_ref().ok_or_else(|| {
        AppError::Configuration(format!(
            "no credential for {}; authenticate first",
            session.repository.provider
        ))
    })
}
