//! Domain models for admin role reconciliation

use crate::error::{AdminSyncError, Result};
use crate::ids::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// =============================================================================
// Tenant
// =============================================================================

/// One independent Okta org being reconciled
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl Tenant {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Role Type Catalog
// =============================================================================

/// Administrative role kinds, declared from lowest to highest privilege.
///
/// The derived `Ord` follows declaration order, so `ReadOnlyAdmin` is the
/// minimum and `SuperAdmin` the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    ReadOnlyAdmin,
    MobileAdmin,
    UserAdmin,
    AppAdmin,
    OrgAdmin,
    SuperAdmin,
}

impl RoleType {
    /// All role types in provisioning order (ascending privilege)
    pub const ASCENDING: [RoleType; 6] = [
        RoleType::ReadOnlyAdmin,
        RoleType::MobileAdmin,
        RoleType::UserAdmin,
        RoleType::AppAdmin,
        RoleType::OrgAdmin,
        RoleType::SuperAdmin,
    ];

    /// The label the directory uses for this role type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnlyAdmin => "READ_ONLY_ADMIN",
            Self::MobileAdmin => "MOBILE_ADMIN",
            Self::UserAdmin => "USER_ADMIN",
            Self::AppAdmin => "APP_ADMIN",
            Self::OrgAdmin => "ORG_ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Whether a raw directory label denotes this role type (ASCII case-insensitive)
    pub fn matches_label(&self, label: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(label)
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleType {
    type Err = AdminSyncError;

    fn from_str(s: &str) -> Result<Self> {
        RoleType::ASCENDING
            .into_iter()
            .find(|role_type| role_type.as_str() == s)
            .ok_or_else(|| AdminSyncError::unknown_role_type(s))
    }
}

// =============================================================================
// Directory Entities
// =============================================================================

/// A directory user.
///
/// Equality and hashing use the directory id only; the login is carried for
/// whitelist checks and log context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
}

impl User {
    pub fn new(id: impl Into<UserId>, login: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            login: login.into(),
        }
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One admin role currently held by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: RoleAssignmentId,
    /// Raw role type label as reported by the directory
    pub label: String,
}

impl RoleAssignment {
    pub fn new(id: impl Into<RoleAssignmentId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    pub fn role_type(&self) -> Result<RoleType> {
        self.label.parse()
    }

    pub fn is(&self, role_type: RoleType) -> bool {
        role_type.matches_label(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One page of a paginated directory listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

// =============================================================================
// Role Policy
// =============================================================================

/// Which group grants each role type, and who is exempt from role removal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePolicy {
    groups: BTreeMap<RoleType, String>,
    whitelist: HashSet<String>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a role type to a group name. Blank names leave the role unmapped.
    pub fn with_group(mut self, role_type: RoleType, group_name: impl Into<String>) -> Self {
        self.set_group(role_type, group_name);
        self
    }

    pub fn with_whitelisted(mut self, login: impl Into<String>) -> Self {
        self.whitelist(login);
        self
    }

    pub fn set_group(&mut self, role_type: RoleType, group_name: impl Into<String>) {
        let name = group_name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            self.groups.remove(&role_type);
        } else {
            self.groups.insert(role_type, trimmed.to_string());
        }
    }

    pub fn whitelist(&mut self, login: impl Into<String>) {
        let login = login.into();
        let trimmed = login.trim();
        if !trimmed.is_empty() {
            self.whitelist.insert(trimmed.to_string());
        }
    }

    /// Group that justifies `role_type`, or `None` when no group maps to it
    pub fn group_for(&self, role_type: RoleType) -> Option<&str> {
        self.groups.get(&role_type).map(String::as_str)
    }

    pub fn is_whitelisted(&self, login: &str) -> bool {
        self.whitelist.contains(login)
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }
}
