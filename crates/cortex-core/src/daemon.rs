//! Maintenance Daemon
//!
//! Background periodic driver for the homeostasis and consolidation
//! cycles. Foreground operations never wait on it; cycle failures are
//! logged and the loop continues - a background failure never poisons
//! the store. Responds to shutdown within one tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::CortexCore;

/// Handle to the running maintenance loop
pub struct MaintenanceDaemon {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl MaintenanceDaemon {
    /// Spawn the maintenance loop for a set of tenants.
    ///
    /// Runs the full prune cycle every `prune_cycle_interval_s` and the
    /// consolidation sweep plus co-access decay every
    /// `consolidation_interval_s`.
    pub fn spawn(core: Arc<CortexCore>, tenants: Vec<String>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let prune_interval = Duration::from_secs(core.config().prune_cycle_interval_s.max(1));
        let consolidation_interval =
            Duration::from_secs(core.config().consolidation_interval_s.max(1));

        let handle = tokio::spawn(run_loop(
            core,
            tenants,
            prune_interval,
            consolidation_interval,
            shutdown_rx,
        ));

        Self { shutdown_tx, handle }
    }

    /// Signal shutdown and wait for the loop to drain
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

async fn run_loop(
    core: Arc<CortexCore>,
    tenants: Vec<String>,
    prune_interval: Duration,
    consolidation_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut prune_tick = tokio::time::interval(prune_interval);
    let mut consolidation_tick = tokio::time::interval(consolidation_interval);
    // The first tick of a tokio interval fires immediately; skip it so a
    // freshly booted engine does not prune before serving anything
    prune_tick.tick().await;
    consolidation_tick.tick().await;

    loop {
        tokio::select! {
            _ = prune_tick.tick() => {
                run_prune_pass(&core, &tenants).await;
            }
            _ = consolidation_tick.tick() => {
                run_consolidation_pass(&core, &tenants).await;
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Maintenance daemon shutting down");
                    return;
                }
            }
        }
    }
}

async fn run_prune_pass(core: &Arc<CortexCore>, tenants: &[String]) {
    for tenant in tenants {
        let core = Arc::clone(core);
        let tenant = tenant.clone();
        let result =
            tokio::task::spawn_blocking(move || core.prune_cycle(&tenant)).await;
        match result {
            Ok(Ok(report)) => {
                tracing::debug!(pruned = report.pruned, "Prune pass done");
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "Prune cycle failed; continuing"),
            Err(e) => tracing::warn!(error = %e, "Prune task panicked; continuing"),
        }
    }
}

async fn run_consolidation_pass(core: &Arc<CortexCore>, tenants: &[String]) {
    for tenant in tenants {
        let core = Arc::clone(core);
        let tenant = tenant.clone();
        let result =
            tokio::task::spawn_blocking(move || core.consolidation_sweep(&tenant)).await;
        match result {
            Ok(Ok(counts)) => {
                tracing::debug!(matured = counts.matured, "Consolidation pass done");
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "Consolidation sweep failed; continuing"),
            Err(e) => tracing::warn!(error = %e, "Consolidation task panicked; continuing"),
        }
    }
    if let Err(e) = core.decay_coaccess() {
        tracing::warn!(error = %e, "Co-access decay failed; continuing");
    }
}

// ============================================================================
// TESTS
// ============================================================================
