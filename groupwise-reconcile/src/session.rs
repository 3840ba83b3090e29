//! Edit session for the groups of a fixed selection of identities
//!
//! The session owns the desired selection (groups for every identity, groups kept
//! only where already held, and the set of groups the user touched) along with its
//! undo history. The reconciler functions are called from here with explicit inputs.

use crate::allocation::{classify, filter_groups, generate};
use crate::diff::{diff, ChangeSummary};
use crate::history::EditHistory;
use groupwise_core::{
    not_found_error, validation_error, Group, GroupAllocations, GroupwiseResult, Identity,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// One entry of the session history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub modified_groups: BTreeSet<String>,
    pub groups_for_all: Vec<String>,
    pub groups_for_some: Vec<String>,
}

/// What confirming the session would change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeReview {
    /// Keyed by identity id
    pub by_identity: ChangeSummary,
    /// Keyed by group name
    pub by_group: ChangeSummary,
    /// The logged-in identity is among the selected ones
    pub self_modification: bool,
}

#[derive(Debug, Clone)]
pub struct GroupEditSession {
    groups: Vec<Group>,
    selected: Vec<Identity>,
    history: EditHistory<SelectionState>,
}

impl GroupEditSession {
    /// Start a session for the identities named in `selected_names`
    pub fn new(
        groups: Vec<Group>,
        identities: Vec<Identity>,
        selected_names: &[String],
    ) -> GroupwiseResult<Self> {
        if selected_names.is_empty() {
            return Err(validation_error!(
                "At least one identity must be selected",
                "selected_names",
                "session"
            ));
        }

        let selected = select_identities(identities, selected_names)?;

        if let Some(locked) = selected.iter().find(|identity| !identity.is_editable()) {
            return Err(validation_error!(
                format!(
                    "Group membership of {} identity {} cannot be modified",
                    locked.authentication_method, locked.name
                ),
                "selected_names",
                "session"
            ));
        }

        let current = classify(&groups, &selected);
        debug!(
            selected = selected.len(),
            assigned_to_all = current.all.len(),
            assigned_to_some = current.some.len(),
            "Opened group edit session"
        );

        Ok(Self {
            groups,
            selected,
            history: EditHistory::new(SelectionState {
                modified_groups: BTreeSet::new(),
                groups_for_all: current.all,
                groups_for_some: current.some,
            }),
        })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn selected(&self) -> &[Identity] {
        &self.selected
    }

    pub fn desired_state(&self) -> &SelectionState {
        self.history.desired_state()
    }

    /// Replace the set of groups assigned to every selected identity
    ///
    /// Repeated names are dropped after their first occurrence.
    pub fn modify_groups(&mut self, new_groups_for_all: Vec<String>) {
        let state = self.history.desired_state();
        let mut seen = HashSet::new();
        let new_groups_for_all: Vec<String> = new_groups_for_all
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();

        // Clearing the selection touches every group
        if new_groups_for_all.is_empty() {
            let next = SelectionState {
                modified_groups: self.groups.iter().map(|g| g.name.clone()).collect(),
                groups_for_all: Vec::new(),
                groups_for_some: Vec::new(),
            };
            self.history.save(next);
            return;
        }

        let old_lookup: HashSet<&str> = state.groups_for_all.iter().map(String::as_str).collect();
        let new_lookup: HashSet<&str> = new_groups_for_all.iter().map(String::as_str).collect();

        let mut modified_groups = state.modified_groups.clone();
        modified_groups.extend(
            new_groups_for_all
                .iter()
                .filter(|name| !old_lookup.contains(name.as_str()))
                .cloned(),
        );
        modified_groups.extend(
            state
                .groups_for_all
                .iter()
                .filter(|name| !new_lookup.contains(name.as_str()))
                .cloned(),
        );

        // A modified group is either for everyone or for no one
        let groups_for_some = state
            .groups_for_some
            .iter()
            .filter(|name| !modified_groups.contains(name.as_str()))
            .cloned()
            .collect();

        let next = SelectionState {
            modified_groups,
            groups_for_all: new_groups_for_all,
            groups_for_some,
        };
        self.history.save(next);
    }

    /// Add `name` to, or remove it from, the groups for every identity
    pub fn toggle_group(&mut self, name: &str) -> GroupwiseResult<()> {
        if !self.groups.iter().any(|group| group.name == name) {
            return Err(not_found_error!(format!("group {}", name), "session"));
        }

        let mut groups_for_all = self.desired_state().groups_for_all.clone();
        match groups_for_all.iter().position(|group| group == name) {
            Some(index) => {
                groups_for_all.remove(index);
            }
            None => groups_for_all.push(name.to_string()),
        }

        self.modify_groups(groups_for_all);
        Ok(())
    }

    /// Take `name` away from every selected identity
    ///
    /// Unlike toggling off the last group for all, this leaves the other groups
    /// held by only some identities in place.
    pub fn deselect_group(&mut self, name: &str) -> GroupwiseResult<()> {
        if !self.groups.iter().any(|group| group.name == name) {
            return Err(not_found_error!(format!("group {}", name), "session"));
        }

        let state = self.desired_state();
        let held = state.groups_for_all.iter().chain(&state.groups_for_some);
        if !held.into_iter().any(|group| group == name) {
            return Ok(());
        }

        let mut next = state.clone();
        next.groups_for_all.retain(|group| group != name);
        next.groups_for_some.retain(|group| group != name);
        next.modified_groups.insert(name.to_string());
        self.history.save(next);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn modified_count(&self) -> usize {
        self.desired_state().modified_groups.len()
    }

    pub fn is_modified(&self, group: &str) -> bool {
        self.desired_state().modified_groups.contains(group)
    }

    /// Groups held by some but not all selected identities and not touched in this session
    pub fn indeterminate_groups(&self) -> BTreeSet<String> {
        let state = self.desired_state();
        classify(&self.groups, &self.selected)
            .some
            .into_iter()
            .filter(|group| !state.modified_groups.contains(group))
            .collect()
    }

    /// Groups whose lowercase name contains every query
    pub fn filter_groups(&self, queries: &[String]) -> Vec<&Group> {
        filter_groups(&self.groups, queries)
    }

    pub fn title(&self) -> String {
        match self.selected.as_slice() {
            [only] => format!("Change groups for {}", only.name),
            selected => format!("Change groups for {} users", selected.len()),
        }
    }

    pub fn modified_status(&self) -> String {
        let count = self.modified_count();
        format!("{} {} will be modified", count, pluralize("group", count))
    }

    pub fn confirm_label(&self) -> String {
        match self.modified_count() {
            0 => "Modify groups".to_string(),
            count => format!("Apply {} group {}", count, pluralize("change", count)),
        }
    }

    /// Target group list for each selected identity
    pub fn plan(&self) -> GroupAllocations {
        let state = self.desired_state();
        generate(&state.groups_for_all, &state.groups_for_some, &self.selected)
    }

    /// Per-identity and per-group changes for confirmation
    pub fn review(&self, auth_user_name: Option<&str>) -> ChangeReview {
        let state = self.desired_state();
        let modified: HashSet<String> = state.modified_groups.iter().cloned().collect();

        let by_identity = diff(&self.selected, &state.groups_for_all, &modified);
        let by_group = by_identity.pivot();
        let self_modification = auth_user_name
            .map(|user| self.selected.iter().any(|identity| identity.name == user))
            .unwrap_or(false);

        ChangeReview {
            by_identity,
            by_group,
            self_modification,
        }
    }
}

/// Identities whose names appear in `names`, in snapshot order
///
/// Every name must match an identity.
pub fn select_identities(
    identities: Vec<Identity>,
    names: &[String],
) -> GroupwiseResult<Vec<Identity>> {
    let known: HashSet<&str> = identities.iter().map(|i| i.name.as_str()).collect();
    if let Some(missing) = names.iter().find(|n| !known.contains(n.as_str())) {
        return Err(not_found_error!(format!("identity {}", missing), "session"));
    }

    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    Ok(identities
        .into_iter()
        .filter(|identity| wanted.contains(identity.name.as_str()))
        .collect())
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupwise_core::{AuthMethod, ChangeView, GroupwiseError};

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn fixture() -> (Vec<Group>, Vec<Identity>) {
        let groups = vec![
            Group::new("admins").with_members(AuthMethod::Oidc, ["u1", "u2"]),
            Group::new("Viewers").with_members(AuthMethod::Oidc, ["u1"]),
            Group::new("auditors"),
        ];
        let identities = vec![
            Identity::new("u1", "alice", AuthMethod::Oidc).with_groups(["admins", "Viewers"]),
            Identity::new("u2", "bob", AuthMethod::Oidc).with_groups(["admins"]),
            Identity::new("c1", "ci", AuthMethod::Tls),
        ];
        (groups, identities)
    }

    fn session() -> GroupEditSession {
        let (groups, identities) = fixture();
        GroupEditSession::new(groups, identities, &names(&["alice", "bob"])).unwrap()
    }

    #[test]
    fn test_initial_state_reflects_current_allocation() {
        let session = session();
        let state = session.desired_state();
        assert_eq!(state.groups_for_all, names(&["admins"]));
        assert_eq!(state.groups_for_some, names(&["Viewers"]));
        assert!(state.modified_groups.is_empty());
        assert!(!session.can_undo());
        assert_eq!(session.confirm_label(), "Modify groups");
    }

    #[test]
    fn test_rejects_empty_unknown_and_tls_selection() {
        let (groups, identities) = fixture();
        assert!(matches!(
            GroupEditSession::new(groups.clone(), identities.clone(), &[]),
            Err(GroupwiseError::Validation { .. })
        ));
        assert!(matches!(
            GroupEditSession::new(groups.clone(), identities.clone(), &names(&["mallory"])),
            Err(GroupwiseError::NotFound { .. })
        ));
        assert!(matches!(
            GroupEditSession::new(groups, identities, &names(&["alice", "ci"])),
            Err(GroupwiseError::Validation { .. })
        ));
    }

    #[test]
    fn test_selecting_a_partial_group_drops_it_from_some() {
        let mut session = session();
        session.modify_groups(names(&["admins", "Viewers"]));

        let state = session.desired_state();
        assert!(state.groups_for_some.is_empty());
        assert_eq!(
            state.modified_groups,
            ["Viewers".to_string()].into_iter().collect()
        );
        assert!(session.indeterminate_groups().is_empty());
        assert_eq!(session.confirm_label(), "Apply 1 group change");
    }

    #[test]
    fn test_clearing_selection_marks_every_group_modified() {
        let mut session = session();
        session.modify_groups(Vec::new());

        assert_eq!(session.modified_count(), 3);
        assert!(session.desired_state().groups_for_some.is_empty());
        assert_eq!(session.modified_status(), "3 groups will be modified");
    }

    #[test]
    fn test_toggle_and_undo() {
        let mut session = session();
        session.toggle_group("auditors").unwrap();
        assert!(session.is_modified("auditors"));
        assert_eq!(
            session.desired_state().groups_for_all,
            names(&["admins", "auditors"])
        );

        session.toggle_group("admins").unwrap();
        assert_eq!(session.modified_count(), 2);

        assert!(session.undo());
        assert!(session.undo());
        assert_eq!(session.modified_count(), 0);
        assert_eq!(session.indeterminate_groups().len(), 1);
        assert!(!session.undo());
    }

    #[test]
    fn test_modify_groups_drops_repeated_names() {
        let mut session = session();
        session.modify_groups(names(&["auditors", "admins", "auditors"]));

        assert_eq!(
            session.desired_state().groups_for_all,
            names(&["auditors", "admins"])
        );
        assert_eq!(session.plan()["u2"], names(&["auditors", "admins"]));
    }

    #[test]
    fn test_deselect_partial_group_removes_it_from_holders() {
        let mut session = session();
        session.deselect_group("Viewers").unwrap();

        let state = session.desired_state();
        assert_eq!(state.groups_for_all, names(&["admins"]));
        assert!(state.groups_for_some.is_empty());
        assert!(session.is_modified("Viewers"));
        assert_eq!(session.plan()["u1"], names(&["admins"]));

        let review = session.review(None);
        assert_eq!(review.by_identity.get("u1").unwrap().removed.len(), 1);
        assert!(review.by_identity.get("u2").is_none());
    }

    #[test]
    fn test_deselect_last_group_for_all_keeps_partial_groups() {
        let mut session = session();
        session.deselect_group("admins").unwrap();

        let state = session.desired_state();
        assert!(state.groups_for_all.is_empty());
        assert_eq!(state.groups_for_some, names(&["Viewers"]));
        assert_eq!(session.modified_count(), 1);
    }

    #[test]
    fn test_deselect_unheld_or_unknown_group() {
        let mut session = session();
        session.deselect_group("auditors").unwrap();
        assert!(!session.can_undo());

        assert!(matches!(
            session.deselect_group("nope"),
            Err(GroupwiseError::NotFound { .. })
        ));
    }

    #[test]
    fn test_select_identities_keeps_snapshot_order() {
        let (_, identities) = fixture();
        let selected = select_identities(identities.clone(), &names(&["bob", "alice"])).unwrap();
        assert_eq!(selected[0].name, "alice");
        assert_eq!(selected[1].name, "bob");

        assert!(select_identities(identities.clone(), &[]).unwrap().is_empty());
        assert!(matches!(
            select_identities(identities, &names(&["alice", "mallory"])),
            Err(GroupwiseError::NotFound { .. })
        ));
    }

    #[test]
    fn test_toggle_unknown_group_fails() {
        let mut session = session();
        assert!(matches!(
            session.toggle_group("nope"),
            Err(GroupwiseError::NotFound { .. })
        ));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_plan_keeps_untouched_partial_groups() {
        let mut session = session();
        session.toggle_group("auditors").unwrap();

        let plan = session.plan();
        assert_eq!(plan["u1"], names(&["admins", "auditors", "Viewers"]));
        assert_eq!(plan["u2"], names(&["admins", "auditors"]));
    }

    #[test]
    fn test_review_and_self_modification() {
        let mut session = session();
        session.toggle_group("auditors").unwrap();
        session.toggle_group("admins").unwrap();

        let review = session.review(Some("bob"));
        assert!(review.self_modification);
        assert_eq!(review.by_identity.len(), 2);
        let admins = review.by_group.get("admins").unwrap();
        assert_eq!(admins.removed.len(), 2);
        assert!(review.by_group.get("Viewers").is_none());

        assert!(!session.review(Some("carol")).self_modification);
        assert!(!session.review(None).self_modification);
    }

    #[test]
    fn test_self_modification_and_table_marker_agree() {
        let mut session = session();
        session.toggle_group("auditors").unwrap();

        let review = session.review(Some("alice"));
        assert!(review.self_modification);
        let table = crate::render::render_table(&review, ChangeView::User, Some("alice"));
        assert!(table.contains("alice (YOU)"));
    }

    #[test]
    fn test_filter_groups_is_case_insensitive_and_conjunctive() {
        let session = session();
        let hits = session.filter_groups(&names(&["VIEW"]));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Viewers");

        assert_eq!(session.filter_groups(&names(&["a", "s"])).len(), 2);
        assert_eq!(session.filter_groups(&[]).len(), 3);
    }

    #[test]
    fn test_titles() {
        let (groups, identities) = fixture();
        let single = GroupEditSession::new(groups, identities, &names(&["bob"])).unwrap();
        assert_eq!(single.title(), "Change groups for bob");
        assert_eq!(session().title(), "Change groups for 2 users");
    }
}
