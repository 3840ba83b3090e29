//! Submitting an edit session to a backend

use crate::session::GroupEditSession;
use groupwise_core::{
    log_operation_error, log_operation_start, log_operation_success, with_deadline,
    GroupAllocations, GroupwiseResult, PermissionsBackend,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Group lists written for each selected identity
    pub allocations: GroupAllocations,
    pub message: String,
}

/// Write the session's plan through `backend`
///
/// Callers should refetch identities and groups afterwards; both views change.
pub async fn apply_session<B>(
    backend: &B,
    session: &GroupEditSession,
    timeout_ms: u64,
) -> GroupwiseResult<ApplyOutcome>
where
    B: PermissionsBackend + ?Sized,
{
    let selected = session.selected();
    log_operation_start!("apply_groups", identities = selected.len());

    let allocations = session.plan();
    let update = backend.update_groups_for_identities(selected, &allocations);

    if let Err(e) = with_deadline(update, timeout_ms, "update_groups_for_identities").await {
        log_operation_error!("apply_groups", e, identities = selected.len());
        return Err(e);
    }

    let message = match selected {
        [only] => format!("Updated groups for {}", only.name),
        _ => format!("Updated groups for {} identities", selected.len()),
    };
    log_operation_success!("apply_groups", identities = selected.len());

    Ok(ApplyOutcome {
        allocations,
        message,
    })
}
