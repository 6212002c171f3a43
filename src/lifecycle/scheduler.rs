//! Background lifecycle scheduler
//!
//! A single dedicated worker running every N minutes (default 15):
//! process scheduled channel deletions, run detect-only reconciliation, and
//! prune history past the retention window. Task failures are isolated so
//! one failing task never skips the others. The stop signal takes effect at
//! the next tick boundary.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use super::engine::{ChannelStore, LifecycleEngine};
use super::reconcile::Reconciler;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub started_at: Option<DateTime<Utc>>,
    pub deleted_channels: usize,
    pub reconciliation_issues: usize,
    pub pruned_history: u64,
    pub errors: Vec<String>,
}

pub struct LifecycleScheduler {
    engine: Arc<LifecycleEngine>,
    reconciler: Arc<Reconciler>,
    store: Arc<dyn ChannelStore>,
    interval_minutes: u64,
    history_retention_days: u32,
    reconcile_on_tick: bool,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    last_run: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl LifecycleScheduler {
    pub fn new(
        engine: Arc<LifecycleEngine>,
        reconciler: Arc<Reconciler>,
        store: Arc<dyn ChannelStore>,
        interval_minutes: u64,
        history_retention_days: u32,
        reconcile_on_tick: bool,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            engine,
            reconciler,
            store,
            interval_minutes: interval_minutes.max(1),
            history_retention_days,
            reconcile_on_tick,
            stop_tx,
            stop_rx,
            last_run: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock().await
    }

    /// Signal the scheduler loop to stop at the next tick boundary
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Run the scheduler loop until stopped; runs once immediately
    pub async fn run(&self) {
        info!(
            "Lifecycle scheduler started (interval: {} minutes)",
            self.interval_minutes
        );

        let mut ticker = interval(Duration::from_secs(self.interval_minutes * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop_rx = self.stop_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_once().await;
                    if !report.errors.is_empty() {
                        error!("Scheduler tick had errors: {:?}", report.errors);
                    }
                }
                result = stop_rx.changed() => {
                    if result.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Lifecycle scheduler stopped");
    }

    /// One full tick, also used for manual invocation
    pub async fn run_once(&self) -> TickReport {
        let now = Utc::now();
        *self.last_run.lock().await = Some(now);
        let mut report = TickReport {
            started_at: Some(now),
            ..Default::default()
        };

        match self.engine.process_scheduled_deletions(now).await {
            Ok(deleted) => {
                report.deleted_channels = deleted.len();
                if !deleted.is_empty() {
                    info!("Scheduler deleted {} expired channel(s)", deleted.len());
                }
            }
            Err(err) => {
                warn!("Deletion task failed: {err}");
                report.errors.push(format!("deletions: {err}"));
            }
        }

        if self.reconcile_on_tick {
            // Detect-only in the background; auto-fix stays manual
            match self.reconciler.reconcile(false).await {
                Ok(result) => report.reconciliation_issues = result.issues.len(),
                Err(err) => {
                    warn!("Reconciliation task failed: {err}");
                    report.errors.push(format!("reconciliation: {err}"));
                }
            }
        }

        let cutoff = now - ChronoDuration::days(i64::from(self.history_retention_days));
        match self.store.prune_history(cutoff).await {
            Ok(pruned) => {
                report.pruned_history = pruned;
                if pruned > 0 {
                    info!("Pruned {pruned} old channel history record(s)");
                }
            }
            Err(err) => {
                warn!("History cleanup failed: {err}");
                report.errors.push(format!("cleanup: {err}"));
            }
        }

        report
    }
}
