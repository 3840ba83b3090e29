//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How an identity authenticates against the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Oidc,
    Tls,
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Oidc => write!(f, "oidc"),
            AuthMethod::Tls => write!(f, "tls"),
        }
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oidc" => Ok(AuthMethod::Oidc),
            "tls" => Ok(AuthMethod::Tls),
            _ => Err(format!("Unknown authentication method: {}", s)),
        }
    }
}

/// An authenticated principal known to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    pub authentication_method: AuthMethod,
    /// Names of the groups this identity belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Identity {
    pub fn new(id: &str, name: &str, authentication_method: AuthMethod) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            authentication_method,
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Lookup set over the identity's current groups
    pub fn group_set(&self) -> HashSet<&str> {
        self.groups.iter().map(String::as_str).collect()
    }

    /// TLS identities cannot have their group membership edited
    pub fn is_editable(&self) -> bool {
        self.authentication_method != AuthMethod::Tls
    }
}

/// A named collection of identities used to grant shared permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Member identity ids, keyed by authentication method
    #[serde(default)]
    pub identities: BTreeMap<AuthMethod, Vec<String>>,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            identities: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_members<I, S>(mut self, method: AuthMethod, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identities
            .insert(method, ids.into_iter().map(Into::into).collect());
        self
    }

    /// Member ids registered under one authentication method
    pub fn members(&self, method: AuthMethod) -> &[String] {
        self.identities
            .get(&method)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Identities and groups as fetched from the daemon at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsSnapshot {
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupwiseConfig {
    pub snapshot: SnapshotConfig,
    pub apply: ApplyConfig,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Path of the JSON permissions snapshot
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Upper bound for a single backend update call
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Default grouping of the change table
    pub group_by: ChangeView,
    /// Name of the logged-in identity, used to flag self-modification
    pub auth_user_name: Option<String>,
}

/// Grouping used when displaying a change summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeView {
    User,
    Group,
}

impl ChangeView {
    pub fn toggle(self) -> Self {
        match self {
            ChangeView::User => ChangeView::Group,
            ChangeView::Group => ChangeView::User,
        }
    }
}

impl std::fmt::Display for ChangeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeView::User => write!(f, "user"),
            ChangeView::Group => write!(f, "group"),
        }
    }
}

impl std::str::FromStr for ChangeView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(ChangeView::User),
            "group" => Ok(ChangeView::Group),
            _ => Err(format!("Unknown change view: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_deserializes_without_membership() {
        let group: Group = serde_json::from_str(r#"{"name": "admins"}"#).unwrap();
        assert_eq!(group.name, "admins");
        assert!(group.description.is_empty());
        assert!(group.members(AuthMethod::Oidc).is_empty());
        assert!(group.members(AuthMethod::Tls).is_empty());
    }

    #[test]
    fn test_group_membership_keyed_by_method() {
        let json = r#"{"name": "ops", "identities": {"oidc": ["a"], "tls": ["b", "c"]}}"#;
        let group: Group = serde_json::from_str(json).unwrap();
        assert_eq!(group.members(AuthMethod::Oidc), ["a".to_string()]);
        assert_eq!(group.members(AuthMethod::Tls).len(), 2);
    }

    #[test]
    fn test_tls_identity_not_editable() {
        let oidc = Identity::new("u1", "alice", AuthMethod::Oidc);
        let tls = Identity::new("c1", "client", AuthMethod::Tls);
        assert!(oidc.is_editable());
        assert!(!tls.is_editable());
    }

    #[test]
    fn test_change_view_parse_and_toggle() {
        assert_eq!("Group".parse::<ChangeView>().unwrap(), ChangeView::Group);
        assert!("table".parse::<ChangeView>().is_err());
        assert_eq!(ChangeView::User.toggle(), ChangeView::Group);
        assert_eq!(ChangeView::Group.toggle(), ChangeView::User);
    }
}
