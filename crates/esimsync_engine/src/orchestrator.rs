//! End-to-end sync cycle driver.

use crate::http::HttpClient;
use crate::merge::{merge_esims, merge_users};
use crate::transport::TransportClient;
use chrono::Utc;
use esimsync_model::{EsimWire, User, UserPush};
use esimsync_store::LocalStore;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How a sync cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Both entity phases ran (individual phase failures may be recorded).
    Completed,
    /// No endpoint was reachable; the cycle was deferred, not failed.
    Deferred,
    /// Another cycle was already in flight; this trigger was dropped.
    Skipped,
}

/// Outcome of one entity phase within a cycle.
#[derive(Debug, Clone, Default)]
pub struct PhaseReport {
    /// Records received from the remote.
    pub pulled: usize,
    /// Local-only records pushed to the remote.
    pub pushed: usize,
    /// Partial failures: the previous local state is preserved and the work
    /// is retried next cycle. Never surfaced as errors.
    pub failures: Vec<String>,
}

impl PhaseReport {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            failures: vec![message.into()],
            ..Self::default()
        }
    }
}

/// Result of one `run_sync` call. Errors never escape the orchestrator;
/// they land here and in the log.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// How the cycle ended.
    pub status: CycleStatus,
    /// User phase outcome.
    pub users: PhaseReport,
    /// Entitlement phase outcome.
    pub esims: PhaseReport,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
}

impl SyncCycleResult {
    fn with_status(status: CycleStatus, duration: Duration) -> Self {
        Self {
            status,
            users: PhaseReport::default(),
            esims: PhaseReport::default(),
            duration,
        }
    }

    /// True when both phases ran without partial failures.
    pub fn is_clean(&self) -> bool {
        self.status == CycleStatus::Completed
            && self.users.failures.is_empty()
            && self.esims.failures.is_empty()
    }
}

/// Accumulated counters across the orchestrator's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles that ran both phases.
    pub cycles_completed: u64,
    /// Cycles deferred for lack of a reachable endpoint.
    pub cycles_deferred: u64,
    /// Triggers dropped by the single-flight guard.
    pub cycles_skipped: u64,
    /// Total user records pulled.
    pub users_pulled: u64,
    /// Total user records pushed.
    pub users_pushed: u64,
    /// Total entitlements pulled.
    pub esims_pulled: u64,
    /// Total partial failures recorded.
    pub partial_failures: u64,
    /// Most recent partial-failure message.
    pub last_failure: Option<String>,
}

struct PeriodicTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives the pull/merge/persist/push cycle for Users and ESims.
///
/// The two entity phases are independent: a failure in one is recorded in
/// its [`PhaseReport`] and never blocks or rolls back the other.
///
/// A single-flight guard ensures at most one cycle runs at a time; a
/// trigger arriving mid-cycle is dropped with [`CycleStatus::Skipped`], so
/// two passes can never interleave writes to the store.
pub struct SyncOrchestrator<C: HttpClient> {
    transport: Arc<TransportClient<C>>,
    store: Arc<LocalStore>,
    stats: RwLock<SyncStats>,
    in_flight: tokio::sync::Mutex<()>,
    periodic: Mutex<Option<PeriodicTask>>,
}

impl<C: HttpClient + 'static> SyncOrchestrator<C> {
    /// Creates an orchestrator over the given transport and store.
    pub fn new(transport: Arc<TransportClient<C>>, store: Arc<LocalStore>) -> Self {
        Self {
            transport,
            store,
            stats: RwLock::new(SyncStats::default()),
            in_flight: tokio::sync::Mutex::new(()),
            periodic: Mutex::new(None),
        }
    }

    /// Returns a copy of the accumulated counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Runs one sync cycle.
    ///
    /// Never returns an error: offline means a deferred cycle, a concurrent
    /// cycle means this trigger is dropped, and per-phase failures are
    /// captured in the result.
    pub async fn run_sync(&self) -> SyncCycleResult {
        let start = Instant::now();

        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("sync already in flight, dropping trigger");
            self.stats.write().cycles_skipped += 1;
            return SyncCycleResult::with_status(CycleStatus::Skipped, start.elapsed());
        };

        if self.transport.ensure_endpoint().await.is_err() {
            tracing::info!("no reachable endpoint, deferring sync cycle");
            self.stats.write().cycles_deferred += 1;
            return SyncCycleResult::with_status(CycleStatus::Deferred, start.elapsed());
        }

        let users = self.sync_users().await;
        let esims = self.sync_esims().await;

        let result = SyncCycleResult {
            status: CycleStatus::Completed,
            users,
            esims,
            duration: start.elapsed(),
        };

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.users_pulled += result.users.pulled as u64;
            stats.users_pushed += result.users.pushed as u64;
            stats.esims_pulled += result.esims.pulled as u64;
            for failure in result.users.failures.iter().chain(&result.esims.failures) {
                stats.partial_failures += 1;
                stats.last_failure = Some(failure.clone());
            }
        }

        tracing::info!(
            users_pulled = result.users.pulled,
            users_pushed = result.users.pushed,
            esims_pulled = result.esims.pulled,
            clean = result.is_clean(),
            "sync cycle finished"
        );
        result
    }

    /// Pull → merge → persist → push for the user set.
    async fn sync_users(&self) -> PhaseReport {
        let remote = match self.transport.fetch_remote_users().await {
            Ok(remote) => remote,
            Err(err) => {
                tracing::warn!(error = %err, "user pull failed");
                return PhaseReport::failed(format!("user pull: {err}"));
            }
        };

        let mut report = PhaseReport {
            pulled: remote.len(),
            ..PhaseReport::default()
        };

        let local = self.store.users();
        let merged = merge_users(&local, &remote);
        if let Err(err) = self.store.replace_users(merged) {
            report.failures.push(format!("user persist: {err}"));
            return report;
        }

        // Push whatever is still local-only. Records without a credential
        // cannot cross the wire and wait for their first login.
        let pending: Vec<User> = self
            .store
            .users()
            .into_iter()
            .filter(|u| u.origin.is_push_candidate() && u.credential.is_some())
            .collect();
        if pending.is_empty() {
            return report;
        }

        let payload: Vec<UserPush> = pending
            .iter()
            .map(|u| UserPush {
                email: u.email.clone(),
                password: u.credential.clone().unwrap_or_default(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
            })
            .collect();

        match self.transport.push_users(payload).await {
            Ok(summary) => {
                report.pushed = pending.len();
                tracing::info!(
                    added = summary.added,
                    existing = summary.existing,
                    "pushed local users"
                );
                if let Err(err) = self.mark_reconciled(&pending) {
                    report.failures.push(format!("user retag: {err}"));
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "user push failed, retrying next cycle");
                report.failures.push(format!("user push: {err}"));
            }
        }

        report
    }

    /// Retags pushed records; an `existing` answer counts as reconciled
    /// too, that dedup is what makes next-cycle retries safe.
    fn mark_reconciled(&self, pushed: &[User]) -> esimsync_store::StoreResult<()> {
        let pushed_emails: BTreeSet<&str> = pushed.iter().map(|u| u.email.as_str()).collect();
        let mut users = self.store.users();
        for user in &mut users {
            if pushed_emails.contains(user.email.as_str()) {
                user.origin = esimsync_model::RecordOrigin::Reconciled;
            }
        }
        self.store.replace_users(users)
    }

    /// Bidirectional roster exchange for entitlements. The request carries
    /// the full local roster, so local-only records ride along as the push
    /// step of this phase.
    async fn sync_esims(&self) -> PhaseReport {
        let local = self.store.esims();
        let outgoing: Vec<EsimWire> = local.iter().map(EsimWire::from_record).collect();
        let pushed = local
            .iter()
            .filter(|e| e.origin.is_push_candidate())
            .count();

        let remote = match self.transport.full_sync_esims(outgoing).await {
            Ok(remote) => remote,
            Err(err) => {
                tracing::warn!(error = %err, "esim sync failed");
                return PhaseReport::failed(format!("esim sync: {err}"));
            }
        };

        let mut report = PhaseReport {
            pulled: remote.len(),
            pushed,
            ..PhaseReport::default()
        };

        let merged = merge_esims(&local, &remote, Utc::now());
        if let Err(err) = self.store.replace_esims(merged) {
            report.failures.push(format!("esim persist: {err}"));
        }
        report
    }

    /// Starts the periodic timer. The first tick fires immediately (the
    /// process-start trigger), then every `interval`. A second call while
    /// the task is running is a no-op.
    pub fn start_periodic(self: Arc<Self>, interval: Duration) {
        let mut slot = self.periodic.lock();
        if slot.is_some() {
            tracing::debug!("periodic sync already running");
            return;
        }

        let (shutdown, mut stopped) = watch::channel(false);
        // The task holds a weak reference so it cannot keep the
        // orchestrator alive past its owner.
        let orchestrator = Arc::downgrade(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        let Some(orchestrator) = orchestrator.upgrade() else {
                            break;
                        };
                        // A stop signal mid-cycle drops the cycle future,
                        // aborting any in-flight request.
                        tokio::select! {
                            _ = stopped.changed() => break,
                            _ = orchestrator.run_sync() => {}
                        }
                    }
                }
            }
            tracing::debug!("periodic sync stopped");
        });

        *slot = Some(PeriodicTask { shutdown, handle });
        tracing::info!(interval_secs = interval.as_secs(), "periodic sync started");
    }

}

impl<C: HttpClient> SyncOrchestrator<C> {
    /// True while the periodic task is installed.
    pub fn is_periodic_running(&self) -> bool {
        self.periodic.lock().is_some()
    }

    /// Stops the periodic timer and aborts any in-flight cycle.
    pub fn stop(&self) {
        if let Some(task) = self.periodic.lock().take() {
            let _ = task.shutdown.send(true);
            task.handle.abort();
        }
    }
}

impl<C: HttpClient> Drop for SyncOrchestrator<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
