//! adminsync - Okta admin role reconciliation

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use adminsync_core::{RolePolicy, RoleType, Tenant};
use adminsync_identity::OktaConnector;
use adminsync_sync::{ReconcileOrchestrator, ReconcileStatus, RunSummary};
use crate::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration; anything invalid stops us before touching a tenant
    let settings = Settings::load().context("Failed to load configuration")?;
    settings.validate().context("Invalid sync settings")?;
    let tenants = settings.tenants().context("Invalid tenant configuration")?;
    let policy = settings.role_policy();

    info!("Starting adminsync v{}", env!("CARGO_PKG_VERSION"));
    info!(
        tenants = tenants.len(),
        whitelisted = policy.whitelist_len(),
        "Configuration loaded successfully"
    );
    log_policy(&policy);

    let connector = Arc::new(OktaConnector::new(settings.http_settings()));
    let orchestrator = ReconcileOrchestrator::new(connector, Arc::new(policy))
        .with_max_concurrent_tenants(settings.sync.max_concurrent_tenants);

    let shutdown = CancellationToken::new();
    tokio::spawn(listen_for_shutdown(shutdown.clone()));

    let run_timeout = settings.run_timeout();

    let Some(interval) = settings.interval() else {
        run_once(&orchestrator, &tenants, run_timeout, &shutdown).await;
        return Ok(());
    };

    info!(interval_secs = interval.as_secs(), "Running on a schedule");
    loop {
        run_once(&orchestrator, &tenants, run_timeout, &shutdown).await;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Shutting down");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,adminsync=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn log_policy(policy: &RolePolicy) {
    for role_type in RoleType::ASCENDING {
        match policy.group_for(role_type) {
            Some(group) => info!("{} is granted by group {}", role_type, group),
            None => warn!(
                "No group configured for {}, every non-whitelisted holder will lose it",
                role_type
            ),
        }
    }
}

async fn listen_for_shutdown(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Received Ctrl-C, finishing in-flight calls and stopping");
            shutdown.cancel();
        }
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}

/// One full pass over every tenant, cancelled by shutdown or the run timeout
async fn run_once(
    orchestrator: &ReconcileOrchestrator<OktaConnector>,
    tenants: &[Tenant],
    run_timeout: Option<Duration>,
    shutdown: &CancellationToken,
) -> RunSummary {
    let cancel = shutdown.child_token();

    let timer = run_timeout.map(|timeout| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_secs = timeout.as_secs(), "Run timed out, cancelling");
            cancel.cancel();
        })
    });

    let summary = orchestrator.run(tenants, &cancel).await;

    if let Some(timer) = timer {
        timer.abort();
    }

    for report in &summary.reports {
        match report.status {
            ReconcileStatus::Success => {}
            ReconcileStatus::PartialSuccess => warn!(
                tenant = %report.tenant,
                failures = report.failures.len(),
                "Tenant reconciled with failures"
            ),
            ReconcileStatus::Failed => error!(tenant = %report.tenant, "Tenant was not reconciled"),
            ReconcileStatus::Cancelled => warn!(tenant = %report.tenant, "Tenant reconciliation was cancelled"),
        }
    }

    summary
}
