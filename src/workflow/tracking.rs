use tracing::{debug, info};

use crate::domain::branch::BranchName;
use crate::domain::entity::{BatchResponse, Entity, FetchParameters, NewEntity};
use crate::error::{AppError, AppResult};
use crate::services::EntityScope;

const ROOT_REPOSITORIES: &str = "scm_repository_roots";
const BRANCHES: &str = "scm_repositories";
const BRANCH_PATTERNS: &str = "scm_commit_patterns";
const LINK_BRANCH: &str = "analytics/ci/link-stories-to-branch?reference-update-mode=append";
const GIT_SCM_TYPE: u64 = 2;

/// Returns the root repository registered for `repo_url`, creating it when
/// none exists. More than one match is an error and nothing is written.
pub async fn get_or_create_root_repository(
    scope: &dyn EntityScope,
    repo_url: &str,
) -> AppResult<Entity> {
    debug!(repo_url, "looking up root repository");
    let parameters = FetchParameters::with_query(format!("\"(url EQ '{repo_url}')\""));
    let existing = scope.fetch_collection(ROOT_REPOSITORIES, &parameters).await?;

    match existing.total_count {
        0 => create_root_repository(scope, repo_url).await,
        1 => existing.data.into_iter().next().ok_or_else(|| {
            AppError::TrackingTool(format!(
                "root repository count for {repo_url} is 1 but no entity was returned"
            ))
        }),
        count => Err(AppError::AmbiguousRootRepository {
            url: repo_url.to_string(),
            count,
        }),
    }
}

async fn create_root_repository(scope: &dyn EntityScope, repo_url: &str) -> AppResult<Entity> {
    info!(repo_url, "creating root repository");
    let root = NewEntity::new()
        .with("name", repo_url)
        .with("url", repo_url)
        .with("scm_type", GIT_SCM_TYPE);
    let response = scope.create_entities(ROOT_REPOSITORIES, &[root]).await?;
    if response.has_errors() {
        return Err(AppError::TrackingToolBatch(response.error_descriptions()));
    }

    match (response.total_count, response.data.into_iter().next()) {
        (1, Some(created)) => Ok(created),
        (count, _) => Err(AppError::TrackingTool(format!(
            "failed to create root repository for {repo_url}: {count} entities returned"
        ))),
    }
}

/// Registers `branch_name` under the repository's root and appends it to
/// the work item's branches. Stops before linking if the branch entity
/// could not be created.
pub async fn create_branch_and_link(
    scope: &dyn EntityScope,
    work_item_id: u64,
    branch_name: &BranchName,
    repo_url: &str,
) -> AppResult<BatchResponse> {
    let root = get_or_create_root_repository(scope, repo_url).await?;

    info!(branch = %branch_name, "creating branch entity");
    let branch = NewEntity::new()
        .with("name", branch_name.as_str())
        .with_reference("repository", &root.reference());
    let created = scope.create_entities(BRANCHES, &[branch]).await?;
    if created.has_errors() {
        return Err(AppError::TrackingToolBatch(created.error_descriptions()));
    }
    let created_branch = created.data.first().ok_or_else(|| {
        AppError::TrackingTool(format!("no branch entity returned for {branch_name}"))
    })?;

    info!(work_item_id, branch_id = %created_branch.id, "linking branch to work item");
    let link = NewEntity::new()
        .with("id", work_item_id.to_string())
        .with_references("scm_branches", &[created_branch.reference()]);
    let linked = scope.update_entities(LINK_BRANCH, &[link]).await?;
    if linked.has_errors() {
        return Err(AppError::TrackingToolBatch(linked.error_descriptions()));
    }
    Ok(linked)
}

/// Branch naming patterns configured for an entity type, in server order.
pub async fn fetch_branch_patterns(
    scope: &dyn EntityScope,
    entity_type: &str,
) -> AppResult<Vec<String>> {
    let parameters = FetchParameters {
        fields: vec![
            "pattern".to_string(),
            "entity_type".to_string(),
            "applies_to".to_string(),
        ],
        query: Some(format!(
            "\"(entity_type EQ {{(id EQ 'list_node.scm_commit_pattern_entity_type.{entity_type}')}};applies_to EQ {{(id EQ 'list_node.commit_pattern.applies_to.branch')}})\""
        )),
        ..FetchParameters::default()
    };
    let patterns = scope.fetch_collection(BRANCH_PATTERNS, &parameters).await?;
    Ok(patterns
        .data
        .iter()
        .filter_map(|pattern| pattern.field_str("pattern"))
        .map(str::to_string)
        .collect())
}
