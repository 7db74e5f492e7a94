use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::entity::{
    BatchResponse, Entity, EntityCollection, FetchParameters, FieldMetadataFilter, NewEntity,
};
use crate::error::AppResult;

/// Entity operations available inside a tracking-tool workspace.
#[async_trait]
pub trait EntityScope: Send + Sync {
    async fn fetch_collection(
        &self,
        collection: &str,
        parameters: &FetchParameters,
    ) -> AppResult<EntityCollection>;

    /// Creates a batch. A 409 is returned as a response whose `errors`
    /// describe the rejected items rather than as an `Err`.
    async fn create_entities(
        &self,
        collection: &str,
        entities: &[NewEntity],
    ) -> AppResult<BatchResponse>;

    /// Same 409 handling as `create_entities`.
    async fn update_entities(
        &self,
        collection: &str,
        entities: &[NewEntity],
    ) -> AppResult<BatchResponse>;

    async fn fetch_field_metadata(
        &self,
        entity_types: &[&str],
        filter: &FieldMetadataFilter,
    ) -> AppResult<Vec<Entity>> {
        let parameters = FetchParameters::with_query(filter.query(entity_types));
        let fields = self.fetch_collection("metadata/fields", &parameters).await?;
        debug!(count = fields.data.len(), "loaded field metadata");
        Ok(fields.data)
    }
}

/// Opens signed-in workspaces of the tracking tool.
#[async_trait]
pub trait TrackingToolService: Send + Sync {
    async fn workspace(
        &self,
        shared_space_id: u64,
        workspace_id: u64,
    ) -> AppResult<Arc<dyn EntityScope>>;
}
