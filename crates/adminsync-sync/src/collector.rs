//! Current-state collection: who holds which admin role right now

use std::collections::{BTreeMap, HashSet};

use adminsync_core::{AdminSyncError, DirectoryGateway, Result, RoleType, User};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Working map from role type to the users holding it.
///
/// Every catalog role type is always present, possibly with an empty set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHolders {
    holders: BTreeMap<RoleType, HashSet<User>>,
}

impl RoleHolders {
    pub fn new() -> Self {
        Self {
            holders: RoleType::ASCENDING
                .into_iter()
                .map(|role_type| (role_type, HashSet::new()))
                .collect(),
        }
    }

    pub fn insert(&mut self, role_type: RoleType, user: User) {
        self.holders.entry(role_type).or_default().insert(user);
    }

    pub fn holders(&self, role_type: RoleType) -> &HashSet<User> {
        // Populated for every role type in `new`
        &self.holders[&role_type]
    }

    pub fn holds(&self, role_type: RoleType, user: &User) -> bool {
        self.holders(role_type).contains(user)
    }

    /// Forget `user` under every role type
    pub fn release(&mut self, user: &User) {
        for users in self.holders.values_mut() {
            users.remove(user);
        }
    }

    pub fn total(&self) -> usize {
        self.holders.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Remaining (role type, holder) pairs, lowest role first, then by user id
    pub fn into_pairs(self) -> Vec<(RoleType, User)> {
        let mut pairs = Vec::with_capacity(self.total());
        for (role_type, users) in self.holders {
            let mut users: Vec<User> = users.into_iter().collect();
            users.sort_by(|a, b| a.id.cmp(&b.id));
            pairs.extend(users.into_iter().map(|user| (role_type, user)));
        }
        pairs
    }
}

impl Default for RoleHolders {
    fn default() -> Self {
        Self::new()
    }
}

/// Baseline of one tenant's admin role assignments
#[derive(Debug, Clone)]
pub struct CollectedAssignments {
    pub holders: RoleHolders,
    pub users_scanned: u64,
    /// Role labels outside the catalog that were skipped
    pub unknown_role_labels: u64,
}

/// Page through every user and record which admin roles they hold.
///
/// A failure to page users or to list one user's roles aborts collection for
/// the tenant. Unknown role labels are logged and skipped.
#[instrument(skip_all)]
pub async fn collect_current_assignments(
    directory: &dyn DirectoryGateway,
    cancel: &CancellationToken,
) -> Result<CollectedAssignments> {
    let mut collected = CollectedAssignments {
        holders: RoleHolders::new(),
        users_scanned: 0,
        unknown_role_labels: 0,
    };
    let mut cursor: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(AdminSyncError::cancelled("stopped while collecting role holders"));
        }

        let page = directory.list_users_page(cursor.as_deref()).await?;
        debug!("Scanning page of {} users", page.items.len());

        for user in page.items {
            if cancel.is_cancelled() {
                return Err(AdminSyncError::cancelled("stopped while collecting role holders"));
            }

            let roles = directory.list_roles(&user.id).await?;
            collected.users_scanned += 1;

            for role in roles {
                match role.role_type() {
                    Ok(role_type) => collected.holders.insert(role_type, user.clone()),
                    Err(e) => {
                        warn!(user = %user.login, "Skipping role: {}", e);
                        collected.unknown_role_labels += 1;
                    }
                }
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(
        users_scanned = collected.users_scanned,
        role_holders = collected.holders.total(),
        "Collected current admin role assignments"
    );

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_holders_cover_every_role_type() {
        let holders = RoleHolders::new();
        for role_type in RoleType::ASCENDING {
            assert!(holders.holders(role_type).is_empty());
        }
        assert!(holders.is_empty());
    }

    #[test]
    fn test_release_removes_user_from_every_role() {
        let alice = User::new("00u1", "alice");
        let bob = User::new("00u2", "bob");

        let mut holders = RoleHolders::new();
        holders.insert(RoleType::AppAdmin, alice.clone());
        holders.insert(RoleType::OrgAdmin, alice.clone());
        holders.insert(RoleType::OrgAdmin, bob.clone());

        holders.release(&alice);

        assert!(!holders.holds(RoleType::AppAdmin, &alice));
        assert!(!holders.holds(RoleType::OrgAdmin, &alice));
        assert!(holders.holds(RoleType::OrgAdmin, &bob));
        assert_eq!(holders.total(), 1);
    }

    #[test]
    fn test_into_pairs_is_ordered_by_privilege_then_id() {
        let mut holders = RoleHolders::new();
        holders.insert(RoleType::SuperAdmin, User::new("00u1", "a"));
        holders.insert(RoleType::ReadOnlyAdmin, User::new("00u3", "c"));
        holders.insert(RoleType::ReadOnlyAdmin, User::new("00u2", "b"));

        let pairs: Vec<(RoleType, String)> = holders
            .into_pairs()
            .into_iter()
            .map(|(r, u)| (r, u.login))
            .collect();

        assert_eq!(
            pairs,
            vec![
                (RoleType::ReadOnlyAdmin, "b".to_string()),
                (RoleType::ReadOnlyAdmin, "c".to_string()),
                (RoleType::SuperAdmin, "a".to_string()),
            ]
        );
    }
}
