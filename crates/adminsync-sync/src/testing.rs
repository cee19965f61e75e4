//! In-memory directory used by the reconciliation tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use adminsync_core::{
    AdminSyncError, DirectoryConnector, DirectoryGateway, Group, GroupId, Page, Result,
    RoleAssignment, RoleAssignmentId, RoleType, Tenant, User, UserId,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A mutating call observed by the fake directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Assign { login: String, role_type: RoleType },
    Unassign { login: String, label: String },
}

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, (User, Vec<RoleAssignment>)>,
    groups: Vec<(Group, HashSet<UserId>)>,
    calls: Vec<Call>,
    next_assignment: u32,
    fail_user_listing: bool,
    fail_group_lookup: HashSet<String>,
    fail_roles_for: HashSet<String>,
    fail_assign_for: HashSet<String>,
    cancel_after_mutations: Option<(usize, CancellationToken)>,
}

pub struct FakeDirectory {
    state: Mutex<State>,
    page_size: usize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 2,
        }
    }

    /// Add a user holding `roles`. The login doubles as the directory id suffix.
    pub fn with_user(self, login: &str, roles: &[RoleType]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let user = User::new(format!("id-{}", login), login);
            let assignments = roles
                .iter()
                .map(|role_type| {
                    state.next_assignment += 1;
                    RoleAssignment::new(format!("ra{}", state.next_assignment), role_type.as_str())
                })
                .collect();
            state.users.insert(user.id.clone(), (user, assignments));
        }
        self
    }

    /// Give an existing user an assignment with an arbitrary label
    pub fn with_raw_role(self, login: &str, label: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_assignment += 1;
            let assignment = RoleAssignment::new(format!("ra{}", state.next_assignment), label);
            let id = UserId::new(format!("id-{}", login));
            if let Some((_, roles)) = state.users.get_mut(&id) {
                roles.push(assignment);
            }
        }
        self
    }

    pub fn with_group(self, name: &str, members: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = format!("grp-{}", state.groups.len() + 1);
            let members = members
                .iter()
                .map(|login| UserId::new(format!("id-{}", login)))
                .collect();
            state.groups.push((Group::new(id, name), members));
        }
        self
    }

    pub fn failing_user_listing(self) -> Self {
        self.state.lock().unwrap().fail_user_listing = true;
        self
    }

    pub fn failing_group_lookup(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_group_lookup
            .insert(name.to_string());
        self
    }

    pub fn failing_roles_for(self, login: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_roles_for
            .insert(login.to_string());
        self
    }

    pub fn failing_assign_for(self, login: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_assign_for
            .insert(login.to_string());
        self
    }

    /// Cancel `token` once `count` mutating calls have been made
    pub fn cancelling_after(self, count: usize, token: CancellationToken) -> Self {
        self.state.lock().unwrap().cancel_after_mutations = Some((count, token));
        self
    }

    /// Role labels a user currently holds, sorted
    pub fn roles_of(&self, login: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let id = UserId::new(format!("id-{}", login));
        let mut labels: Vec<String> = state
            .users
            .get(&id)
            .map(|(_, roles)| roles.iter().map(|r| r.label.clone()).collect())
            .unwrap_or_default();
        labels.sort();
        labels
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(state: &mut State, call: Call) {
        state.calls.push(call);
        if let Some((count, token)) = &state.cancel_after_mutations {
            if state.calls.len() >= *count {
                token.cancel();
            }
        }
    }
}

#[async_trait]
impl DirectoryGateway for FakeDirectory {
    async fn list_users_page(&self, cursor: Option<&str>) -> Result<Page<User>> {
        let state = self.state.lock().unwrap();
        if state.fail_user_listing {
            return Err(AdminSyncError::directory_unavailable("connection refused"));
        }

        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let items: Vec<User> = state
            .users
            .values()
            .skip(start)
            .take(self.page_size)
            .map(|(user, _)| user.clone())
            .collect();
        let end = start + items.len();
        let next_cursor = (end < state.users.len()).then(|| end.to_string());

        Ok(Page { items, next_cursor })
    }

    async fn list_roles(&self, user_id: &UserId) -> Result<Vec<RoleAssignment>> {
        let state = self.state.lock().unwrap();
        let (user, roles) = state
            .users
            .get(user_id)
            .ok_or_else(|| AdminSyncError::directory_rejected(404, "user not found"))?;
        if state.fail_roles_for.contains(&user.login) {
            return Err(AdminSyncError::directory_unavailable("read timed out"));
        }
        Ok(roles.clone())
    }

    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>> {
        let state = self.state.lock().unwrap();
        if state.fail_group_lookup.contains(name) {
            return Err(AdminSyncError::directory_unavailable("HTTP 503"));
        }
        Ok(state
            .groups
            .iter()
            .filter(|(group, _)| group.name == name)
            .map(|(group, _)| group.clone())
            .collect())
    }

    async fn list_group_members(&self, group_id: &GroupId) -> Result<HashSet<User>> {
        let state = self.state.lock().unwrap();
        let (_, members) = state
            .groups
            .iter()
            .find(|(group, _)| &group.id == group_id)
            .ok_or_else(|| AdminSyncError::directory_rejected(404, "group not found"))?;
        Ok(members
            .iter()
            .filter_map(|id| state.users.get(id).map(|(user, _)| user.clone()))
            .collect())
    }

    async fn assign_role(&self, user_id: &UserId, role_type: RoleType) -> Result<RoleAssignment> {
        let mut state = self.state.lock().unwrap();
        let login = state
            .users
            .get(user_id)
            .map(|(user, _)| user.login.clone())
            .ok_or_else(|| AdminSyncError::directory_rejected(404, "user not found"))?;
        if state.fail_assign_for.contains(&login) {
            return Err(AdminSyncError::directory_rejected(403, "forbidden"));
        }

        state.next_assignment += 1;
        let assignment =
            RoleAssignment::new(format!("ra{}", state.next_assignment), role_type.as_str());
        if let Some((_, roles)) = state.users.get_mut(user_id) {
            roles.push(assignment.clone());
        }
        Self::record(&mut state, Call::Assign { login, role_type });
        Ok(assignment)
    }

    async fn unassign_role(
        &self,
        user_id: &UserId,
        assignment_id: &RoleAssignmentId,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let (user, roles) = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| AdminSyncError::directory_rejected(404, "user not found"))?;
        let position = roles
            .iter()
            .position(|r| &r.id == assignment_id)
            .ok_or_else(|| AdminSyncError::directory_rejected(404, "role not found"))?;
        let removed = roles.remove(position);
        let login = user.login.clone();
        Self::record(
            &mut state,
            Call::Unassign {
                login,
                label: removed.label,
            },
        );
        Ok(())
    }
}

/// Connector handing out fake directories by tenant name
#[derive(Default)]
pub struct FakeConnector {
    directories: HashMap<String, Arc<FakeDirectory>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, name: &str, directory: Arc<FakeDirectory>) -> Self {
        self.directories.insert(name.to_string(), directory);
        self
    }
}

impl DirectoryConnector for FakeConnector {
    fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn DirectoryGateway>> {
        self.directories
            .get(&tenant.name)
            .map(|d| d.clone() as Arc<dyn DirectoryGateway>)
            .ok_or_else(|| AdminSyncError::internal_error(format!("no directory for {}", tenant.name)))
    }
}

pub fn tenant(name: &str) -> Tenant {
    Tenant::new(name, format!("https://{}.okta.test", name), "token")
}
