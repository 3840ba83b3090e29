//! Permissions backends
//!
//! Implementations of [`PermissionsBackend`] that keep identities and groups in
//! memory or in a JSON snapshot file.

pub mod memory;
pub mod snapshot;

pub use memory::MemoryBackend;
pub use snapshot::SnapshotBackend;

use groupwise_core::{
    not_found_error, GroupAllocations, GroupwiseResult, PermissionsBackend, PermissionsSnapshot,
};
use std::collections::HashSet;

/// Rewrite identity group lists and the matching group memberships in one step
///
/// Every identity and every target group is checked before anything is modified.
pub(crate) fn apply_allocations(
    snapshot: &mut PermissionsSnapshot,
    identity_ids: &[String],
    allocations: &GroupAllocations,
) -> GroupwiseResult<usize> {
    let known_groups: HashSet<&str> = snapshot.groups.iter().map(|g| g.name.as_str()).collect();

    for id in identity_ids {
        if !snapshot.identities.iter().any(|identity| &identity.id == id) {
            return Err(not_found_error!(format!("identity {}", id), "backend"));
        }
        if let Some(target) = allocations.get(id) {
            if let Some(unknown) = target.iter().find(|g| !known_groups.contains(g.as_str())) {
                return Err(not_found_error!(format!("group {}", unknown), "backend"));
            }
        }
    }

    let mut updated = 0;
    for identity in snapshot
        .identities
        .iter_mut()
        .filter(|identity| identity_ids.contains(&identity.id))
    {
        let Some(target) = allocations.get(&identity.id) else {
            continue;
        };

        identity.groups = target.clone();
        for group in snapshot.groups.iter_mut() {
            if let Some(members) = group.identities.get_mut(&identity.authentication_method) {
                members.retain(|member| member != &identity.id);
            }
            if target.contains(&group.name) {
                group
                    .identities
                    .entry(identity.authentication_method)
                    .or_default()
                    .push(identity.id.clone());
            }
        }
        updated += 1;
    }

    Ok(updated)
}

/// Load both collections from a backend into one snapshot
pub async fn fetch_snapshot<B>(backend: &B) -> GroupwiseResult<PermissionsSnapshot>
where
    B: PermissionsBackend + ?Sized,
{
    let identities = backend.fetch_identities().await?;
    let groups = backend.fetch_groups().await?;
    Ok(PermissionsSnapshot { identities, groups })
}
