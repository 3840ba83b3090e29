//! Group allocation across a selection of identities
//!
//! Classification reads membership from the groups' identity lists; generation reads
//! it from the identities' group lists.

use groupwise_core::{AuthMethod, Group, GroupAllocations, Identity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Members of one group, split by authentication method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembers<'a> {
    pub oidc: &'a [String],
    pub tls: &'a [String],
    /// OIDC members followed by TLS members
    pub all: Vec<&'a str>,
    pub total: usize,
}

pub fn group_members(group: &Group) -> GroupMembers<'_> {
    let oidc = group.members(AuthMethod::Oidc);
    let tls = group.members(AuthMethod::Tls);
    let all: Vec<&str> = oidc.iter().chain(tls).map(String::as_str).collect();
    let total = all.len();

    GroupMembers {
        oidc,
        tls,
        all,
        total,
    }
}

/// Groups held by every selected identity and groups held by only some of them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationClassification {
    pub all: Vec<String>,
    pub some: Vec<String>,
}

/// Number of `identities` found in each group's membership, in group order
pub fn allocated_counts<'g>(
    groups: &'g [Group],
    identities: &[Identity],
) -> Vec<(&'g str, usize)> {
    groups
        .iter()
        .map(|group| {
            let lookup: HashSet<&str> = group
                .identities
                .values()
                .flatten()
                .map(String::as_str)
                .collect();
            let count = identities
                .iter()
                .filter(|identity| lookup.contains(identity.id.as_str()))
                .count();
            (group.name.as_str(), count)
        })
        .collect()
}

/// Classify each group as assigned to all, some or none of `identities`
///
/// With no identities selected both lists are empty.
pub fn classify(groups: &[Group], identities: &[Identity]) -> AllocationClassification {
    let mut classification = AllocationClassification::default();
    let total = identities.len();
    if total == 0 {
        return classification;
    }

    for (name, count) in allocated_counts(groups, identities) {
        if count == total {
            classification.all.push(name.to_string());
        } else if count > 0 {
            classification.some.push(name.to_string());
        }
    }

    classification
}

/// Groups whose name contains every query, ignoring case
pub fn filter_groups<'g>(groups: &'g [Group], queries: &[String]) -> Vec<&'g Group> {
    let queries: Vec<String> = queries.iter().map(|q| q.to_lowercase()).collect();
    groups
        .iter()
        .filter(|group| {
            let name = group.name.to_lowercase();
            queries.iter().all(|q| name.contains(q.as_str()))
        })
        .collect()
}

/// Target group list for every identity
///
/// Each identity receives `groups_for_all` in order, followed by those of
/// `groups_for_some` it already belonged to. Any other group is dropped.
pub fn generate(
    groups_for_all: &[String],
    groups_for_some: &[String],
    identities: &[Identity],
) -> GroupAllocations {
    identities
        .iter()
        .map(|identity| {
            let existing = identity.group_set();
            let mut target = groups_for_all.to_vec();
            target.extend(
                groups_for_some
                    .iter()
                    .filter(|group| existing.contains(group.as_str()))
                    .cloned(),
            );
            (identity.id.clone(), target)
        })
        .collect()
}
