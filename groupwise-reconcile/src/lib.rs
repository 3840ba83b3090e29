//! Groupwise Reconcile - group allocation for selections of identities
//!
//! Classifies current group allocations, generates per-identity targets, computes
//! and pivots change summaries, and drives edit sessions against a backend.

pub mod allocation;
pub mod apply;
pub mod backend;
pub mod diff;
pub mod history;
pub mod naming;
pub mod render;
pub mod session;

pub use allocation::{
    allocated_counts, classify, filter_groups, generate, group_members, AllocationClassification,
    GroupMembers,
};
pub use apply::{apply_session, ApplyOutcome};
pub use backend::{fetch_snapshot, MemoryBackend, SnapshotBackend};
pub use diff::{diff, pivot, ChangeEntry, ChangeSummary};
pub use history::EditHistory;
pub use naming::{decode_identity_name_from_url, encode_identity_name_for_url};
pub use render::{change_rows, render_table, ChangeKind, ChangeRow};
pub use session::{select_identities, ChangeReview, GroupEditSession, SelectionState};
