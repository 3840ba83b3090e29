//! Change summaries between current and desired group membership

use groupwise_core::Identity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Changes recorded for one identity (or one group, once pivoted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Display name of the keyed entity
    pub name: String,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl ChangeEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Change entries keyed by identity id, or by group name when pivoted
///
/// Only non-empty entries are ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSummary {
    entries: BTreeMap<String, ChangeEntry>,
}

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry` under `key` unless it records no change
    pub fn insert(&mut self, key: &str, entry: ChangeEntry) {
        if !entry.is_empty() {
            self.entries.insert(key.to_string(), entry);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ChangeEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Regroup by the names recorded inside the entries
    pub fn pivot(&self) -> ChangeSummary {
        pivot(self)
    }

    fn entry_mut(&mut self, key: &str) -> &mut ChangeEntry {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| ChangeEntry::new(key))
    }
}

/// Compute per-identity additions and removals
///
/// A group is added when it is in `new_groups` but not held by the identity. A held
/// group is removed only if it is also in `modified_groups` and not in `new_groups`,
/// so groups held by some identities and left untouched are never reported.
pub fn diff(
    identities: &[Identity],
    new_groups: &[String],
    modified_groups: &HashSet<String>,
) -> ChangeSummary {
    let new_lookup: HashSet<&str> = new_groups.iter().map(String::as_str).collect();
    let mut summary = ChangeSummary::new();

    for identity in identities {
        let existing = identity.group_set();
        let mut entry = ChangeEntry::new(&identity.name);

        entry.added = new_groups
            .iter()
            .filter(|group| !existing.contains(group.as_str()))
            .cloned()
            .collect();

        entry.removed = identity
            .groups
            .iter()
            .filter(|group| modified_groups.contains(group.as_str()))
            .filter(|group| !new_lookup.contains(group.as_str()))
            .cloned()
            .collect();

        summary.insert(&identity.id, entry);
    }

    summary
}

/// Invert a summary: each added or removed item becomes a key listing the entity names
pub fn pivot(summary: &ChangeSummary) -> ChangeSummary {
    let mut pivoted = ChangeSummary::new();

    for (_, entry) in summary.iter() {
        for item in &entry.added {
            pivoted.entry_mut(item).added.insert(entry.name.clone());
        }
        for item in &entry.removed {
            pivoted.entry_mut(item).removed.insert(entry.name.clone());
        }
    }

    pivoted
}
