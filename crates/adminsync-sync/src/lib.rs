//! adminsync sync - Admin role reconciliation
//!
//! Reconciles Okta admin role assignments against group membership:
//! - `collector` builds the baseline of current role holders
//! - `engine` provisions group members and revokes unjustified roles
//! - `orchestrator` runs the engine across tenants with failure isolation
//! - `report` carries per-tenant and per-run outcomes

pub mod collector;
pub mod engine;
pub mod orchestrator;
pub mod report;

#[cfg(test)]
mod testing;


pub use collector::{collect_current_assignments, CollectedAssignments, RoleHolders};
pub use engine::{deprovision, provision, Mutations, TenantReconciler};
pub use orchestrator::ReconcileOrchestrator;
pub use report::{
    FailureUnit, ReconcileFailure, ReconcileReport, ReconcileStatus, RunSummary, UnitContext,
};
