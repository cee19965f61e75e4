//! Per-tenant and per-run reconciliation results

use adminsync_core::{AdminSyncError, Result, RoleType, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::engine::Mutations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    Success,
    /// Some users or groups failed; the rest of the tenant was reconciled
    PartialSuccess,
    /// The tenant could not be reconciled at all
    Failed,
    Cancelled,
}

/// The unit of work a failure was isolated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureUnit {
    Tenant,
    RoleGroup,
    Provision,
    Deprovision,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileFailure {
    pub unit: FailureUnit,
    pub role_type: Option<RoleType>,
    pub group: Option<String>,
    pub user: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Context attached to a unit of work so failures can be diagnosed
#[derive(Debug, Clone)]
pub struct UnitContext {
    pub unit: FailureUnit,
    pub role_type: Option<RoleType>,
    pub group: Option<String>,
    pub user: Option<String>,
}

impl UnitContext {
    pub fn tenant() -> Self {
        Self {
            unit: FailureUnit::Tenant,
            role_type: None,
            group: None,
            user: None,
        }
    }

    pub fn role_group(role_type: RoleType, group: &str) -> Self {
        Self {
            unit: FailureUnit::RoleGroup,
            role_type: Some(role_type),
            group: Some(group.to_string()),
            user: None,
        }
    }

    pub fn provision(role_type: RoleType, group: &str, user: &User) -> Self {
        Self {
            unit: FailureUnit::Provision,
            role_type: Some(role_type),
            group: Some(group.to_string()),
            user: Some(user.login.clone()),
        }
    }

    pub fn deprovision(role_type: RoleType, user: &User) -> Self {
        Self {
            unit: FailureUnit::Deprovision,
            role_type: Some(role_type),
            group: None,
            user: Some(user.login.clone()),
        }
    }
}

/// Outcome of reconciling one tenant
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub tenant: String,
    pub status: ReconcileStatus,
    pub users_scanned: u64,
    pub unknown_role_labels: u64,
    pub roles_assigned: u64,
    pub roles_unassigned: u64,
    /// Group members whose roles had to change
    pub users_provisioned: u64,
    /// Unjustified holders who lost a role
    pub users_deprovisioned: u64,
    pub whitelisted_skipped: u64,
    /// Holders kept because the group for their role could not be read
    pub unresolved_skipped: u64,
    /// Set when the eviction sweep did not run
    pub sweep_skipped: bool,
    pub failures: Vec<ReconcileFailure>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(skip)]
    cancelled: bool,
}

impl ReconcileReport {
    pub fn new(tenant: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            tenant: tenant.into(),
            status: ReconcileStatus::Success,
            users_scanned: 0,
            unknown_role_labels: 0,
            roles_assigned: 0,
            roles_unassigned: 0,
            users_provisioned: 0,
            users_deprovisioned: 0,
            whitelisted_skipped: 0,
            unresolved_skipped: 0,
            sweep_skipped: false,
            failures: vec![],
            started_at: now,
            completed_at: now,
            duration_ms: 0,
            cancelled: false,
        }
    }

    /// Capture the result of one unit of work.
    ///
    /// Failures are logged with the unit's context and recorded; the caller
    /// continues with the next unit. Cancellation is recorded as such rather
    /// than as a failure.
    pub fn capture<T>(&mut self, context: UnitContext, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(AdminSyncError::Cancelled { message }) => {
                self.mark_cancelled(&message);
                None
            }
            Err(e) => {
                error!(
                    tenant = %self.tenant,
                    unit = ?context.unit,
                    role_type = context.role_type.map(|r| r.as_str()).unwrap_or("-"),
                    group = context.group.as_deref().unwrap_or("-"),
                    user = context.user.as_deref().unwrap_or("-"),
                    "Reconciliation unit failed: {}",
                    e
                );
                self.failures.push(ReconcileFailure {
                    unit: context.unit,
                    role_type: context.role_type,
                    group: context.group,
                    user: context.user,
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
                None
            }
        }
    }

    pub fn mark_cancelled(&mut self, reason: &str) {
        if !self.cancelled {
            warn!(tenant = %self.tenant, "Reconciliation cancelled: {}", reason);
        }
        self.cancelled = true;
        self.sweep_skipped = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn record_mutations(&mut self, mutations: Mutations) {
        self.roles_assigned += u64::from(mutations.assigned);
        self.roles_unassigned += u64::from(mutations.unassigned);
    }

    pub fn mutation_count(&self) -> u64 {
        self.roles_assigned + self.roles_unassigned
    }

    /// Settle status and timing once the tenant is done
    pub fn finish(mut self) -> Self {
        self.completed_at = Utc::now();
        self.duration_ms = (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;

        self.status = if self.cancelled {
            ReconcileStatus::Cancelled
        } else if self
            .failures
            .iter()
            .any(|f| f.unit == FailureUnit::Tenant)
        {
            ReconcileStatus::Failed
        } else if !self.failures.is_empty() {
            ReconcileStatus::PartialSuccess
        } else {
            ReconcileStatus::Success
        };

        info!(
            tenant = %self.tenant,
            status = ?self.status,
            users_scanned = self.users_scanned,
            roles_assigned = self.roles_assigned,
            roles_unassigned = self.roles_unassigned,
            whitelisted_skipped = self.whitelisted_skipped,
            unresolved_skipped = self.unresolved_skipped,
            failures = self.failures.len(),
            duration_ms = self.duration_ms,
            "Tenant reconciliation finished"
        );

        self
    }
}

/// Outcome of one run across all tenants, in configured tenant order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub reports: Vec<ReconcileReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn count(&self, status: ReconcileStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }

    /// True when every tenant reconciled without any failure
    pub fn is_clean(&self) -> bool {
        self.reports
            .iter()
            .all(|r| r.status == ReconcileStatus::Success)
    }

    pub fn report_for(&self, tenant: &str) -> Option<&ReconcileReport> {
        self.reports.iter().find(|r| r.tenant == tenant)
    }
}
