//! Tenant orchestrator - runs the reconciler across all configured tenants
//!
//! The orchestrator:
//! - Connects a gateway per tenant
//! - Isolates every tenant's failures from the others
//! - Bounds how many tenants are reconciled at once
//! - Stops starting tenants once the run is cancelled

use std::sync::Arc;

use adminsync_core::{AdminSyncError, DirectoryConnector, RolePolicy, Tenant};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::engine::TenantReconciler;
use crate::report::{ReconcileReport, ReconcileStatus, RunSummary, UnitContext};

/// Orchestrator coordinating reconciliation across tenants
pub struct ReconcileOrchestrator<C>
where
    C: DirectoryConnector,
{
    connector: Arc<C>,
    policy: Arc<RolePolicy>,
    max_concurrent_tenants: usize,
}

impl<C> ReconcileOrchestrator<C>
where
    C: DirectoryConnector + 'static,
{
    /// Create a new orchestrator that processes tenants one at a time
    pub fn new(connector: Arc<C>, policy: Arc<RolePolicy>) -> Self {
        Self {
            connector,
            policy,
            max_concurrent_tenants: 1,
        }
    }

    /// Allow up to `limit` tenants to be reconciled concurrently
    pub fn with_max_concurrent_tenants(mut self, limit: usize) -> Self {
        self.max_concurrent_tenants = limit.max(1);
        self
    }

    /// Reconcile every tenant. Reports come back in `tenants` order.
    #[instrument(skip_all, fields(tenants = tenants.len()))]
    pub async fn run(&self, tenants: &[Tenant], cancel: &CancellationToken) -> RunSummary {
        let started_at = Utc::now();
        info!(
            max_concurrent_tenants = self.max_concurrent_tenants,
            "Starting admin role reconciliation"
        );

        let reports: Vec<ReconcileReport> = stream::iter(tenants)
            .map(|tenant| self.reconcile_tenant(tenant, cancel))
            .buffered(self.max_concurrent_tenants)
            .collect()
            .await;

        let summary = RunSummary {
            reports,
            started_at,
            completed_at: Utc::now(),
        };

        info!(
            succeeded = summary.count(ReconcileStatus::Success),
            partial = summary.count(ReconcileStatus::PartialSuccess),
            failed = summary.count(ReconcileStatus::Failed),
            cancelled = summary.count(ReconcileStatus::Cancelled),
            "Admin role reconciliation completed"
        );

        summary
    }

    /// Reconcile a single tenant; never fails, outcomes land in the report
    #[instrument(skip(self, tenant, cancel), fields(tenant = %tenant.name))]
    pub async fn reconcile_tenant(
        &self,
        tenant: &Tenant,
        cancel: &CancellationToken,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::new(&tenant.name);

        if cancel.is_cancelled() {
            report.capture::<()>(
                UnitContext::tenant(),
                Err(AdminSyncError::cancelled("run cancelled before the tenant started")),
            );
            return report.finish();
        }

        info!("Reconciling admin roles on {}", tenant.base_url);

        let directory = match report.capture(UnitContext::tenant(), self.connector.connect(tenant)) {
            Some(directory) => directory,
            None => {
                report.sweep_skipped = true;
                return report.finish();
            }
        };

        TenantReconciler::new(directory.as_ref(), &self.policy, cancel)
            .run(&mut report)
            .await;

        report.finish()
    }
}
