//! Core traits for admin role reconciliation

use crate::{error::Result, ids::*, models::*};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

// =============================================================================
// Directory Traits
// =============================================================================

/// Operations the reconciler needs from one tenant's directory.
///
/// Each instance is bound to a single tenant.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    /// Fetch one page of users. `None` starts from the first page.
    async fn list_users_page(&self, cursor: Option<&str>) -> Result<Page<User>>;

    /// Admin roles currently assigned to a user, in directory order
    async fn list_roles(&self, user_id: &UserId) -> Result<Vec<RoleAssignment>>;

    /// Every group whose name is exactly `name`. Directories may hold
    /// several, e.g. app-sourced groups sharing a name with a native one.
    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>>;

    /// The first group named exactly `name`
    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self.find_groups_by_name(name).await?.into_iter().next())
    }

    /// All members of a group
    async fn list_group_members(&self, group_id: &GroupId) -> Result<HashSet<User>>;

    /// Grant a role type to a user
    async fn assign_role(&self, user_id: &UserId, role_type: RoleType) -> Result<RoleAssignment>;

    /// Remove one role assignment from a user
    async fn unassign_role(&self, user_id: &UserId, assignment_id: &RoleAssignmentId)
        -> Result<()>;
}

/// Builds a tenant-bound gateway
pub trait DirectoryConnector: Send + Sync {
    fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn DirectoryGateway>>;
}
