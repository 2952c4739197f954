use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::domain::assign_dense_ranks;
use crate::error::ReconcileError;
use crate::metrics;
use crate::repository::LeaderboardStore;

/// Consecutive failed passes before the loop starts backing off.
const BACKOFF_AFTER_FAILURES: u32 = 3;

/// Summary of one completed reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Rows returned by the scan
    pub scanned: u64,
    /// Rows whose rank was rewritten
    pub updated: u64,
    /// Rows that already held the computed rank
    pub unchanged: u64,
    /// Rank writes that failed; those rows keep their previous rank
    pub failed: u64,
    pub duration_ms: u64,
}

/// Recomputes dense ranks from the durable leaderboard and writes them back.
///
/// Ingestion is never blocked. Passes themselves are serialized so the periodic
/// loop and an on-demand request cannot interleave their rank writes.
pub struct RankReconciler {
    store: Arc<dyn LeaderboardStore>,
    pass_lock: Mutex<()>,
}

impl RankReconciler {
    pub fn new(store: Arc<dyn LeaderboardStore>) -> Self {
        Self {
            store,
            pass_lock: Mutex::new(()),
        }
    }

    /// Run one pass. A failed scan aborts before any rank is written.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ReconcileError> {
        let _pass = self.pass_lock.lock().await;
        let started_at = Utc::now();
        let start = Instant::now();

        let rows = match self.store.scan_ordered_by_score_desc().await {
            Ok(rows) => rows,
            Err(err) => {
                metrics::record_reconcile_scan_failure();
                return Err(ReconcileError::Scan(err));
            }
        };

        let scanned = rows.len() as u64;
        let mut updated = 0u64;
        let mut unchanged = 0u64;
        let mut failed = 0u64;

        for assignment in assign_dense_ranks(rows) {
            if assignment.is_unchanged() {
                unchanged += 1;
                continue;
            }

            match self
                .store
                .set_rank(&assignment.subject_id, assignment.rank)
                .await
            {
                Ok(()) => updated += 1,
                Err(err) => {
                    failed += 1;
                    warn!(
                        subject_id = %assignment.subject_id,
                        rank = assignment.rank,
                        previous_rank = ?assignment.previous_rank,
                        error = %err,
                        "Failed to write rank"
                    );
                }
            }
        }

        let elapsed = start.elapsed();
        metrics::observe_reconcile_pass(elapsed, failed);

        let report = ReconcileReport {
            started_at,
            completed_at: Utc::now(),
            scanned,
            updated,
            unchanged,
            failed,
            duration_ms: elapsed.as_millis() as u64,
        };

        info!(
            scanned = report.scanned,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Rank reconciliation pass completed"
        );

        Ok(report)
    }
}

/// Delay applied after `consecutive_failures` failed passes, if any.
pub fn failure_backoff(consecutive_failures: u32) -> Option<Duration> {
    if consecutive_failures < BACKOFF_AFTER_FAILURES {
        return None;
    }
    Some(Duration::from_secs(2u64.pow(consecutive_failures.min(5))))
}

/// Run reconciliation every `every` until `shutdown` flips to `true` or its
/// sender is dropped. The first pass runs immediately.
pub async fn run_reconciler_loop(
    reconciler: Arc<RankReconciler>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures = 0u32;

    info!(interval_secs = every.as_secs(), "Starting rank reconciler loop");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match reconciler.reconcile().await {
                    Ok(_) => {
                        if consecutive_failures > 0 {
                            info!(
                                recovered_after = consecutive_failures,
                                "Rank reconciler recovered after failures"
                            );
                            consecutive_failures = 0;
                        }
                    }
                    Err(err) => {
                        consecutive_failures += 1;
                        error!(
                            error = %err,
                            consecutive_failures,
                            "Rank reconciliation failed, will retry on next interval"
                        );

                        if let Some(backoff) = failure_backoff(consecutive_failures) {
                            info!(
                                backoff_secs = backoff.as_secs(),
                                "Applying exponential backoff due to consecutive failures"
                            );
                            tokio::select! {
                                biased;
                                changed = shutdown.changed() => {
                                    if changed.is_err() || *shutdown.borrow() {
                                        break;
                                    }
                                }
                                _ = tokio::time::sleep(backoff) => {}
                            }
                        }
                    }
                }
            }
        }
    }

    info!("Rank reconciler loop stopped");
}
