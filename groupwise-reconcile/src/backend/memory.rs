//! In-memory permissions backend

use super::apply_allocations;
use async_trait::async_trait;
use groupwise_core::{
    Group, GroupAllocations, GroupwiseResult, Identity, PermissionsBackend, PermissionsSnapshot,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Backend holding identities and groups behind an async lock
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<PermissionsSnapshot>,
}

impl MemoryBackend {
    pub fn new(identities: Vec<Identity>, groups: Vec<Group>) -> Self {
        Self::from_snapshot(PermissionsSnapshot { identities, groups })
    }

    pub fn from_snapshot(snapshot: PermissionsSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> PermissionsSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl PermissionsBackend for MemoryBackend {
    async fn fetch_identities(&self) -> GroupwiseResult<Vec<Identity>> {
        Ok(self.state.read().await.identities.clone())
    }

    async fn fetch_groups(&self) -> GroupwiseResult<Vec<Group>> {
        Ok(self.state.read().await.groups.clone())
    }

    async fn update_groups_for_identities(
        &self,
        identities: &[Identity],
        allocations: &GroupAllocations,
    ) -> GroupwiseResult<()> {
        let ids: Vec<String> = identities.iter().map(|i| i.id.clone()).collect();
        let mut state = self.state.write().await;
        let updated = apply_allocations(&mut state, &ids, allocations)?;
        debug!(updated = updated, "Updated identity groups in memory");
        Ok(())
    }
}
