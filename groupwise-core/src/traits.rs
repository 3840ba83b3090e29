//! Core trait definitions

use crate::error::GroupwiseResult;
use crate::types::*;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Target group list per identity id
pub type GroupAllocations = BTreeMap<String, Vec<String>>;

/// Access to the daemon's identities and groups
///
/// Fetches and writes are independent calls; implementations do not promise that
/// the identity view and the group view agree at read time.
#[async_trait]
pub trait PermissionsBackend: Send + Sync {
    /// Fetch all identities
    async fn fetch_identities(&self) -> GroupwiseResult<Vec<Identity>>;

    /// Fetch all groups
    async fn fetch_groups(&self) -> GroupwiseResult<Vec<Group>>;

    /// Replace the group lists of `identities` with their entries in `allocations`
    async fn update_groups_for_identities(
        &self,
        identities: &[Identity],
        allocations: &GroupAllocations,
    ) -> GroupwiseResult<()>;
}
