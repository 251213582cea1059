use crate::types::{ItemDescriptor, ListQuery, MetadataTypeInfo, Result, UserIdentity, UserRecord};
use async_trait::async_trait;

/// Trait for the remote org capabilities a change scan needs.
///
/// Implementations own transport, authentication and retries. They must
/// normalize listing responses so that a missing or single-element result
/// still comes back as a vector.
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Every metadata type the org knows about
    async fn describe_types(&self) -> Result<Vec<MetadataTypeInfo>>;

    /// List components for up to [`crate::batcher::LIST_QUERY_LIMIT`] type queries
    async fn list_items(&self, queries: &[ListQuery]) -> Result<Vec<ItemDescriptor>>;

    /// Identity of the user the connection is authenticated as
    async fn resolve_identity(&self) -> Result<UserIdentity>;

    /// Look up a user's display name by record id
    async fn query_display_name(&self, user_id: &str) -> Result<UserRecord>;

    /// API version used for calls and written into the manifest
    fn api_version(&self) -> String;
}
