//! Periodic sweep
//!
//! Event handling is best effort, so every `interval` the leader walks every
//! Slack application in Governor and converges each linked group: create the
//! user group if missing, then replace its members.
//!
//! ```text
//! tick ──→ leader? ──no──→ skip
//!            │
//!           yes ──→ applications + types ──→ slack apps ──→ groups ──→ create (exists ok)
//!                                                                  └──→ update members
//! ```
//!
//! With a [`LeaderLock`] only the replica holding the lock sweeps; the lock
//! expires one interval plus a margin after the last refresh.

use std::sync::Arc;
use std::time::Duration;

use gsa_01_leader_lock::LeaderLock;
use shared_types::AuditContext;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{ReconcileError, ReconcileResult};
use crate::service::Reconciler;

/// Counters for one completed sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Slack applications visited.
    pub applications: usize,
    /// Application/group pairs reconciled.
    pub groups: usize,
    /// Operations that failed and were skipped.
    pub failures: usize,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another replica holds the lock, or the lock store failed.
    Skipped,
    /// Sweep ran to completion.
    Completed(SweepStats),
    /// Governor listing failed before any group was visited.
    Aborted,
}

/// Drives the engine on a fixed interval.
pub struct SweepDriver {
    reconciler: Arc<Reconciler>,
    lock: Option<LeaderLock>,
    interval: Duration,
}

impl SweepDriver {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        let interval = reconciler.config().interval;
        Self {
            reconciler,
            lock: None,
            interval,
        }
    }

    /// Only sweep while holding `lock`.
    pub fn with_lock(mut self, lock: LeaderLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sweep every interval until `shutdown` flips to `true`. The first
    /// sweep happens one interval after start; a sweep in progress is
    /// dropped at its next await point when shutdown arrives.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.interval.is_zero() {
            error!("reconciler interval must be positive, not starting loop");
            return;
        }

        info!(
            reconciler_id = %self.reconciler.id(),
            interval = ?self.interval,
            governor_url = self.reconciler.governor().url(),
            dry_run = self.reconciler.config().dry_run,
            "starting reconciler loop"
        );

        if let Some(lock) = &self.lock {
            let ttl = lock.ttl().await;
            info!(
                bucket = lock.name(),
                ttl = ?ttl,
                "using jetstream kv store for locking and leader election"
            );
        }

        match self.reconciler.slack().list_workspaces().await {
            Ok(workspaces) => {
                info!(?workspaces, "slack token has access to the following workspaces")
            }
            Err(e) => error!(error = %e, "error listing slack workspaces"),
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    // Operations re-read both sides; a partial sweep is safe to drop.
                    tokio::select! {
                        _ = self.tick() => {}
                        _ = shutdown.wait_for(|stop| *stop) => {
                            warn!("shutdown requested, abandoning reconciler loop");
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(reconciler_id = %self.reconciler.id(), "shutting down reconciler");
    }

    /// One scheduled sweep, gated on leadership.
    pub async fn tick(&self) -> TickOutcome {
        if let Some(lock) = &self.lock {
            match lock.acquire_lead(self.reconciler.id()).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("not leader, skipping loop");
                    return TickOutcome::Skipped;
                }
                Err(e) => {
                    error!(error = %e, "error checking for leader lock");
                    return TickOutcome::Skipped;
                }
            }
        }

        info!(time = %chrono::Utc::now().to_rfc3339(), "executing reconciler loop");

        match self.run_once().await {
            Ok(stats) => {
                info!(
                    time = %chrono::Utc::now().to_rfc3339(),
                    applications = stats.applications,
                    groups = stats.groups,
                    failures = stats.failures,
                    "finished reconciler loop"
                );
                TickOutcome::Completed(stats)
            }
            Err(e) => {
                error!(error = %e, "reconciler loop aborted");
                TickOutcome::Aborted
            }
        }
    }

    /// Sweep once without consulting the lock.
    pub async fn run_once(&self) -> ReconcileResult<SweepStats> {
        let governor = self.reconciler.governor();
        let audit = AuditContext::reconcile_loop(governor.url());

        let apps = governor.applications().await.map_err(|e| {
            error!(error = %e, "error listing governor applications");
            e
        })?;
        debug!(count = apps.len(), "got applications");

        let types = governor.application_types().await.map_err(|e| {
            error!(error = %e, "error listing governor application types");
            e
        })?;

        let wanted = &self.reconciler.config().application_type;
        let desired = types
            .into_iter()
            .find(|t| &t.slug == wanted)
            .ok_or_else(|| ReconcileError::ApplicationTypeNotFound(wanted.clone()))?;

        let mut stats = SweepStats::default();

        for app in apps
            .iter()
            .filter(|a| a.type_id.as_deref() == Some(desired.id.as_str()))
        {
            stats.applications += 1;

            let groups = match governor.application_groups(&app.id).await {
                Ok(groups) => groups,
                Err(e) => {
                    error!(governor_app_id = %app.id, error = %e, "error listing groups");
                    stats.failures += 1;
                    continue;
                }
            };

            debug!(application = %app.name, count = groups.len(), "got groups");

            for group in &groups {
                stats.groups += 1;

                match self.reconciler.create_user_group(&audit, &group.id, &app.id).await {
                    Ok(()) => {}
                    Err(e) if e.is_group_already_exists() => {}
                    Err(e) => {
                        warn!(governor_group_id = %group.id, error = %e, "error creating user group");
                        stats.failures += 1;
                    }
                }

                if let Err(e) = self
                    .reconciler
                    .update_user_group_members(&audit, &group.id, &app.id)
                    .await
                {
                    warn!(governor_group_id = %group.id, error = %e, "error updating user group members");
                    stats.failures += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Give up leadership so another replica can take over immediately.
    pub async fn stop(&self) {
        if let Some(lock) = &self.lock {
            if let Err(e) = lock.release_lead(self.reconciler.id()).await {
                error!(error = %e, "error releasing leader lock");
            }
        }
    }
}
