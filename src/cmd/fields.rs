use clap::Args;

use crate::cmd::branch::WorkspaceArgs;
use crate::context::AppContext;
use crate::domain::entity::{AccessLevel, FieldMetadataFilter};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct FieldsArgs {
    /// Entity types to describe (repeatable).
    #[arg(long = "entity", required = true)]
    pub entities: Vec<String>,
    #[arg(long)]
    pub visible_in_ui: Option<bool>,
    #[arg(long)]
    pub editable: Option<bool>,
    /// PUBLIC, PUBLIC_INTERNAL, PUBLIC_TECH_PREVIEW or PRIVATE.
    #[arg(long)]
    pub access_level: Option<AccessLevel>,
    #[command(flatten)]
    pub scope: WorkspaceArgs,
}

pub async fn run(ctx: &AppContext, args: FieldsArgs) -> AppResult<()> {
    let filter = FieldMetadataFilter {
        visible_in_ui: args.visible_in_ui,
        editable: args.editable,
        access_level: args.access_level,
    };
    let entity_types: Vec<&str> = args.entities.iter().map(String::as_str).collect();

    let scope = ctx
        .tracking_tool
        .workspace(args.scope.shared_space, args.scope.workspace)
        .await?;
    for field in scope.fetch_field_metadata(&entity_types, &filter).await? {
        println!(
            "{}  {}  {}",
            field.field_str("entity_name").unwrap_or("-"),
            field.field_str("name").unwrap_or(field.id.as_str()),
            field.field_str("label").unwrap_or("")
        );
    }
    Ok(())
}
