use clap::Args;

use crate::context::AppContext;
use crate::domain::repository::ScmProviderKind;
use crate::domain::work_item::{WorkItem, pattern_entity_type};
use crate::error::AppResult;
use crate::workflow::branch::{
    self, BranchOutcome, CredentialSource, NameSelection, authenticate, find_base,
    list_base_branches, reusable_token, start_session,
};

#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Tracking-tool shared space id.
    #[arg(long)]
    pub shared_space: u64,
    /// Tracking-tool workspace id.
    #[arg(long)]
    pub workspace: u64,
}

#[derive(Args, Debug, Clone)]
pub struct WorkItemArgs {
    /// Work item id.
    #[arg(long)]
    pub id: u64,
    /// Work item subtype (story, defect, quality_story, ...).
    #[arg(long, default_value = "story")]
    pub subtype: String,
    /// Work item name; becomes the tail of the branch name.
    #[arg(long)]
    pub name: String,
    #[command(flatten)]
    pub scope: WorkspaceArgs,
}

impl From<WorkItemArgs> for WorkItem {
    fn from(args: WorkItemArgs) -> Self {
        WorkItem {
            id: args.id,
            subtype: args.subtype,
            name: args.name,
            shared_space_id: args.scope.shared_space,
            workspace_id: args.scope.workspace,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// OAuth authorization code returned by the provider.
    #[arg(long)]
    pub code: Option<String>,
    /// Access token to use as-is.
    #[arg(long)]
    pub token: Option<String>,
}

impl From<CredentialArgs> for CredentialSource {
    fn from(args: CredentialArgs) -> Self {
        CredentialSource {
            code: args.code,
            token: args.token,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PatternsArgs {
    /// Work item subtype to look up patterns for.
    #[arg(long, default_value = "story")]
    pub subtype: String,
    #[command(flatten)]
    pub scope: WorkspaceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct NameArgs {
    #[command(flatten)]
    pub work_item: WorkItemArgs,
    /// Use this branch name instead of the generated one.
    #[arg(long)]
    pub branch: Option<String>,
    /// Branch pattern to apply, by text or by the number `patterns` lists.
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AuthorizeArgs {
    /// Clone URL of a configured repository.
    #[arg(long)]
    pub repo: String,
}

#[derive(Args, Debug, Clone)]
pub struct BranchesArgs {
    /// Clone URL of a configured repository.
    #[arg(long)]
    pub repo: String,
    #[command(flatten)]
    pub credential: CredentialArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub work_item: WorkItemArgs,
    /// Clone URL of a configured repository.
    #[arg(long)]
    pub repo: String,
    /// Branch to start from, by identifier or name.
    #[arg(long)]
    pub base: String,
    /// Use this branch name instead of the generated one.
    #[arg(long)]
    pub branch: Option<String>,
    /// Branch pattern to apply, by text or by the number `patterns` lists.
    #[arg(long)]
    pub pattern: Option<String>,
    #[command(flatten)]
    pub credential: CredentialArgs,
}

pub fn run_repos(ctx: &AppContext) -> AppResult<()> {
    if ctx.config.repositories.is_empty() {
        println!("No repositories configured.");
        return Ok(());
    }
    for provider in ScmProviderKind::ALL {
        let repositories = ctx.config.repositories.for_provider(provider);
        if repositories.is_empty() {
            continue;
        }
        println!("{provider}:");
        for repository in repositories {
            println!("  {repository}");
        }
    }
    Ok(())
}

pub async fn run_patterns(ctx: &AppContext, args: PatternsArgs) -> AppResult<()> {
    let patterns = branch::branch_patterns(
        ctx,
        args.scope.shared_space,
        args.scope.workspace,
        pattern_entity_type(&args.subtype),
    )
    .await?;
    if patterns.is_empty() {
        println!("No branch patterns configured.");
    }
    for (index, pattern) in patterns.iter().enumerate() {
        println!("{}  {pattern}", index + 1);
    }
    Ok(())
}

pub async fn run_name(ctx: &AppContext, args: NameArgs) -> AppResult<()> {
    let work_item = WorkItem::from(args.work_item);
    let selection = NameSelection {
        branch: args.branch.as_deref(),
        pattern: args.pattern.as_deref(),
    };
    let name = branch::resolve_branch_name(ctx, &work_item, selection).await?;
    println!("{name}");
    Ok(())
}

pub fn run_authorize(ctx: &AppContext, args: AuthorizeArgs) -> AppResult<()> {
    let repository = branch::select_repository(ctx, &args.repo)?;
    match branch::authorize_url(ctx, repository.provider)? {
        Some(url) => println!("{url}"),
        None => println!(
            "{} uses the configured access token; no authorization needed.",
            repository.provider
        ),
    }
    Ok(())
}

pub async fn run_branches(ctx: &AppContext, args: BranchesArgs) -> AppResult<()> {
    let repository = branch::select_repository(ctx, &args.repo)?;
    let source = CredentialSource::from(args.credential);
    let credential = branch::resolve_credential(ctx, repository.provider, &source).await?;
    // The code is spent now; without the token a later `create` would need
    // a fresh authorization.
    if let Some(token) = reusable_token(&source, &credential) {
        eprintln!("{}", token_notice(token));
    }
    for found in branch::list_branches(ctx, &repository, &credential).await? {
        println!("{}  {}", found.id, found.display_name);
    }
    Ok(())
}

pub async fn run_create(ctx: &AppContext, args: CreateArgs) -> AppResult<BranchOutcome> {
    let selection = NameSelection {
        branch: args.branch.as_deref(),
        pattern: args.pattern.as_deref(),
    };
    let mut session = start_session(ctx, args.work_item.into(), &args.repo, selection).await?;
    authenticate(ctx, &mut session, &args.credential.into()).await?;

    let branches = list_base_branches(ctx, &session).await?;
    let base = find_base(&branches, &args.base)?.id.clone();
    branch::create_branch(ctx, session, &base).await
}

fn token_notice(token: &str) -> String {
    format!("Access token (secret, pass it as --token to reuse): {token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_notice_carries_reusable_token() {
        let notice = token_notice("gho_abc");
        assert!(notice.ends_with(": gho_abc"));
        assert!(notice.contains("--token"));
    }

    #[test]
    fn create_args_take_pattern_selection() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            create: CreateArgs,
        }

        let harness = Harness::try_parse_from([
            "scm-branch-link",
            "--id",
            "1001",
            "--name",
            "Login",
            "--shared-space",
            "1",
            "--workspace",
            "2",
            "--repo",
            "https://github.com/o/r.git",
            "--base",
            "main",
            "--pattern",
            "2",
            "--code",
            "abc",
        ])
        .unwrap();
        assert_eq!(harness.create.pattern.as_deref(), Some("2"));
        assert_eq!(harness.create.work_item.subtype, "story");
        assert_eq!(harness.create.credential.code.as_deref(), Some("abc"));
    }
}
