//! Reconciliation engine
//!
//! Brings one tenant's admin role assignments into line with group
//! membership:
//! 1. Collect the baseline of current role holders
//! 2. Resolve group membership for every mapped role type, lowest privilege first
//! 3. Provision each member into the highest role any of their groups grants
//! 4. Revoke roles still held without group backing, sparing whitelisted logins
//!    and holders of role types whose group could not be read

use std::collections::{BTreeSet, HashMap, HashSet};

use adminsync_core::{AdminSyncError, DirectoryGateway, Result, RolePolicy, RoleType, User};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::collector::collect_current_assignments;
use crate::report::{ReconcileReport, UnitContext};

/// Mutating directory calls issued by one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutations {
    pub assigned: u32,
    pub unassigned: u32,
}

impl Mutations {
    pub fn is_noop(&self) -> bool {
        self.assigned == 0 && self.unassigned == 0
    }
}

/// Make `role_type` the only admin role `user` holds.
///
/// Any other assignment is removed; the role is assigned only when the user
/// does not already hold it, so repeating the call is a no-op.
pub async fn provision(
    directory: &dyn DirectoryGateway,
    user: &User,
    role_type: RoleType,
) -> Result<Mutations> {
    let mut mutations = Mutations::default();
    let mut already_held = false;

    for assignment in directory.list_roles(&user.id).await? {
        if assignment.is(role_type) {
            already_held = true;
        } else {
            directory.unassign_role(&user.id, &assignment.id).await?;
            debug!(user = %user.login, "Removed {} while provisioning {}", assignment.label, role_type);
            mutations.unassigned += 1;
        }
    }

    if !already_held {
        directory.assign_role(&user.id, role_type).await?;
        mutations.assigned += 1;
    }

    Ok(mutations)
}

/// Remove the first assignment of `role_type` held by `user`.
///
/// Duplicate assignments of the same type are left for the next run.
pub async fn deprovision(
    directory: &dyn DirectoryGateway,
    user: &User,
    role_type: RoleType,
) -> Result<Mutations> {
    let mut mutations = Mutations::default();

    let roles = directory.list_roles(&user.id).await?;
    if let Some(assignment) = roles.into_iter().find(|a| a.is(role_type)) {
        directory.unassign_role(&user.id, &assignment.id).await?;
        mutations.unassigned += 1;
    }

    Ok(mutations)
}

/// Members of the groups mapped to each role type
struct Memberships {
    /// (role type, group name, members), ascending privilege
    groups: Vec<(RoleType, String, HashSet<User>)>,
    /// Role types whose group lookup failed
    unresolved: BTreeSet<RoleType>,
}

impl Memberships {
    /// Highest role type each member is entitled to
    fn entitlements(&self) -> HashMap<User, RoleType> {
        let mut entitled: HashMap<User, RoleType> = HashMap::new();
        for (role_type, _, members) in &self.groups {
            for user in members {
                entitled
                    .entry(user.clone())
                    .and_modify(|current| *current = (*current).max(*role_type))
                    .or_insert(*role_type);
            }
        }
        entitled
    }
}

/// Reconciles a single tenant through its gateway
pub struct TenantReconciler<'a> {
    directory: &'a dyn DirectoryGateway,
    policy: &'a RolePolicy,
    cancel: &'a CancellationToken,
}

impl<'a> TenantReconciler<'a> {
    pub fn new(
        directory: &'a dyn DirectoryGateway,
        policy: &'a RolePolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            directory,
            policy,
            cancel,
        }
    }

    /// Run the full reconciliation, recording outcomes into `report`
    #[instrument(skip_all, fields(tenant = %report.tenant))]
    pub async fn run(&self, report: &mut ReconcileReport) {
        let collected = match report.capture(
            UnitContext::tenant(),
            collect_current_assignments(self.directory, self.cancel).await,
        ) {
            Some(collected) => collected,
            None => {
                report.sweep_skipped = true;
                return;
            }
        };
        report.users_scanned = collected.users_scanned;
        report.unknown_role_labels = collected.unknown_role_labels;
        let mut holders = collected.holders;

        let memberships = self.resolve_memberships(report).await;
        if report.is_cancelled() {
            return;
        }

        let entitled = memberships.entitlements();
        let mut unsettled: HashSet<User> = HashSet::new();

        for (role_type, group_name, members) in &memberships.groups {
            let mut members: Vec<&User> = members
                .iter()
                .filter(|user| entitled.get(*user) == Some(role_type))
                .collect();
            members.sort_by(|a, b| a.id.cmp(&b.id));

            for user in members {
                if self.check_cancelled(report) {
                    return;
                }

                let outcome = provision(self.directory, user, *role_type).await;
                match report.capture(UnitContext::provision(*role_type, group_name, user), outcome) {
                    Some(mutations) => {
                        if !mutations.is_noop() {
                            info!(user = %user.login, "Provisioned {}", role_type);
                            report.users_provisioned += 1;
                        }
                        report.record_mutations(mutations);
                        holders.release(user);
                    }
                    None => {
                        unsettled.insert(user.clone());
                    }
                }
            }
        }

        if !memberships.unresolved.is_empty() {
            warn!(
                "Groups for {:?} could not be read, their current holders keep the role this run",
                memberships.unresolved
            );
        }

        for (role_type, user) in holders.into_pairs() {
            if self.check_cancelled(report) {
                return;
            }

            if self.policy.is_whitelisted(&user.login) {
                debug!(user = %user.login, "Whitelisted, keeping {}", role_type);
                report.whitelisted_skipped += 1;
                continue;
            }

            if memberships.unresolved.contains(&role_type) {
                debug!(user = %user.login, "Group for {} unresolved, keeping it", role_type);
                report.unresolved_skipped += 1;
                continue;
            }

            if unsettled.contains(&user) {
                debug!(user = %user.login, "Provisioning failed earlier, keeping {}", role_type);
                continue;
            }

            let outcome = deprovision(self.directory, &user, role_type).await;
            if let Some(mutations) = report.capture(UnitContext::deprovision(role_type, &user), outcome) {
                if !mutations.is_noop() {
                    info!(user = %user.login, "Revoked {}", role_type);
                    report.users_deprovisioned += 1;
                }
                report.record_mutations(mutations);
            }
        }
    }

    /// Fetch the members of every mapped group, lowest privilege first.
    ///
    /// A failed lookup is recorded and the role type marked unresolved, so
    /// nobody is provisioned into it and its holders survive the sweep. A group
    /// that does not exist counts as having no members.
    async fn resolve_memberships(&self, report: &mut ReconcileReport) -> Memberships {
        let mut memberships = Memberships {
            groups: Vec::new(),
            unresolved: BTreeSet::new(),
        };

        for role_type in RoleType::ASCENDING {
            if self.check_cancelled(report) {
                break;
            }

            let Some(group_name) = self.policy.group_for(role_type) else {
                debug!("No group mapped to {}, nothing to provision", role_type);
                continue;
            };

            let outcome = self.group_members(group_name).await;
            match report.capture(UnitContext::role_group(role_type, group_name), outcome) {
                Some(members) => {
                    debug!("Group {} grants {} to {} users", group_name, role_type, members.len());
                    memberships
                        .groups
                        .push((role_type, group_name.to_string(), members));
                }
                None => {
                    memberships.unresolved.insert(role_type);
                }
            }
        }

        memberships
    }

    /// Members of every group named `group_name`, combined
    async fn group_members(&self, group_name: &str) -> Result<HashSet<User>> {
        let groups = self.directory.find_groups_by_name(group_name).await?;
        if groups.is_empty() {
            warn!("Group {} not found, treating it as empty", group_name);
        }

        let mut members = HashSet::new();
        for group in groups {
            members.extend(self.directory.list_group_members(&group.id).await?);
        }
        Ok(members)
    }

    fn check_cancelled(&self, report: &mut ReconcileReport) -> bool {
        if self.cancel.is_cancelled() {
            report.capture::<()>(
                UnitContext::tenant(),
                Err(AdminSyncError::cancelled("run cancelled before the tenant finished")),
            );
            true
        } else {
            false
        }
    }
}
