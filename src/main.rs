mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cache::ResponseCache;
use crate::cmd::branch::{
    AuthorizeArgs, BranchesArgs, CreateArgs, NameArgs, PatternsArgs, run_authorize,
    run_branches, run_create, run_name, run_patterns, run_repos,
};
use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::fields::{self, FieldsArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::repository::ScmProviderKind;
use crate::error::AppResult;
use crate::infra::bitbucket_cloud::BitbucketCloudClient;
use crate::infra::bitbucket_server::BitbucketServerClient;
use crate::infra::github::GithubCloudClient;
use crate::infra::http;
use crate::infra::octane::OctaneConnector;
use crate::services::ScmProviders;

#[derive(Parser)]
#[command(
    name = "scm-branch-link",
    author,
    version,
    about = "Create source-control branches for Octane work items and link them back"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured repositories by provider.
    Repos,
    /// List the Octane branch patterns for a work item subtype.
    Patterns(PatternsArgs),
    /// Print the branch name a work item would get.
    Name(NameArgs),
    /// Print the OAuth authorization URL for a repository's provider.
    Authorize(AuthorizeArgs),
    /// List the branches of a repository.
    Branches(BranchesArgs),
    /// Create a branch for a work item and link it in Octane.
    Create(CreateArgs),
    /// Describe Octane entity fields.
    Fields(FieldsArgs),
    /// Inspect the configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    if config.repositories.is_empty() {
        warn!("no repositories configured; set *_REPOSITORIES to allow branch creation");
    }
    if config.octane.supports_branches && config.octane.url.is_none() {
        warn!("Octane branch support enabled but OCTANE_URL is not set");
    }

    let context = build_context(config)?;

    match cli.command {
        Commands::Repos => run_repos(&context),
        Commands::Patterns(args) => run_patterns(&context, args).await,
        Commands::Name(args) => run_name(&context, args).await,
        Commands::Authorize(args) => run_authorize(&context, args),
        Commands::Branches(args) => run_branches(&context, args).await,
        Commands::Create(args) => {
            let outcome = run_create(&context, args).await?;
            debug!(response = %outcome.created, "provider accepted branch");
            println!(
                "Branch {} created in {}.",
                outcome.session.branch_name, outcome.session.repository.clone_url
            );
            match outcome.link {
                Some(_) => println!("Linked to work item {}.", outcome.session.work_item.id),
                None => println!("Octane branch support disabled; branch not linked."),
            }
            Ok(())
        }
        Commands::Fields(args) => fields::run(&context, args).await,
        Commands::Config(args) => config_cmd::run(&context.config, args.command),
    }
}

fn build_context(config: AppConfig) -> AppResult<AppContext> {
    let client = http::client()?;
    let paging = &config.paging;

    let providers = ScmProviders::new()
        .register(Arc::new(BitbucketCloudClient::new(
            client.clone(),
            config.bitbucket_cloud.clone(),
            paging.for_provider(ScmProviderKind::BitbucketCloud).clone(),
        )))
        .register(Arc::new(BitbucketServerClient::new(
            client.clone(),
            config.bitbucket_server_token.clone(),
            paging.for_provider(ScmProviderKind::BitbucketServer).clone(),
        )))
        .register(Arc::new(GithubCloudClient::new(
            client,
            config.github_cloud.clone(),
            paging.for_provider(ScmProviderKind::GithubCloud).clone(),
        )));

    let tracking_tool = Arc::new(OctaneConnector::new(
        config.clone(),
        Arc::new(ResponseCache::new()),
    ));

    Ok(AppContext::new(config, providers, tracking_tool))
}
