use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::stream::{ScoreStream, StreamRecord};
use crate::domain::ScoreEvent;
use crate::metrics;
use crate::repository::{LeaderboardStore, RankingStore};

/// Pause after a failed fetch before polling the stream again.
const FETCH_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Undecodable or invalid; no store was touched.
    Poison,
    /// Both stores were attempted in order. A `false` flag means that write failed.
    Applied {
        fast_store_ok: bool,
        durable_store_ok: bool,
    },
}

/// Counters for one worker's run, returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub fetched: u64,
    pub applied: u64,
    pub poison: u64,
    pub fast_failures: u64,
    pub durable_failures: u64,
    pub commit_failures: u64,
    pub fetch_errors: u64,
}

impl PipelineStats {
    fn observe(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Poison => self.poison += 1,
            RecordOutcome::Applied {
                fast_store_ok,
                durable_store_ok,
            } => {
                self.applied += 1;
                if !fast_store_ok {
                    self.fast_failures += 1;
                }
                if !durable_store_ok {
                    self.durable_failures += 1;
                }
            }
        }
    }
}

/// Ingestion pipeline: stream record -> fast store -> durable store -> ack.
///
/// Store failures are logged and never stop the loop. The record is acknowledged
/// either way, so a failed durable write is only repaired by a later event for
/// the same subject.
#[derive(Clone)]
pub struct IngestionPipeline {
    ranking: Arc<dyn RankingStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    worker: usize,
}

impl IngestionPipeline {
    pub fn new(ranking: Arc<dyn RankingStore>, leaderboard: Arc<dyn LeaderboardStore>) -> Self {
        Self {
            ranking,
            leaderboard,
            worker: 0,
        }
    }

    /// Tag log lines with a worker index when several pipelines share a process.
    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = worker;
        self
    }

    /// Consume `stream` until it ends or `shutdown` flips to `true`.
    ///
    /// A record already fetched is always processed and acknowledged before the
    /// shutdown signal is looked at again. Dropping the sender also stops the loop.
    pub async fn run<S>(&self, stream: &mut S, mut shutdown: watch::Receiver<bool>) -> PipelineStats
    where
        S: ScoreStream + ?Sized,
    {
        let mut stats = PipelineStats::default();
        info!(worker = self.worker, "Score ingestion worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                next = stream.next_record() => next,
            };

            match next {
                Ok(Some(record)) => {
                    stats.fetched += 1;
                    let outcome = self.handle_record(&record).await;
                    stats.observe(outcome);
                    self.acknowledge(stream, &record, &mut stats).await;
                }
                Ok(None) => {
                    info!(worker = self.worker, "Score stream ended");
                    break;
                }
                Err(err) => {
                    stats.fetch_errors += 1;
                    metrics::record_fetch_error();
                    error!(worker = self.worker, error = %err, "Failed to fetch score record");

                    tokio::select! {
                        biased;
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(FETCH_ERROR_PAUSE) => {}
                    }
                }
            }
        }

        info!(
            worker = self.worker,
            fetched = stats.fetched,
            applied = stats.applied,
            poison = stats.poison,
            fast_failures = stats.fast_failures,
            durable_failures = stats.durable_failures,
            commit_failures = stats.commit_failures,
            fetch_errors = stats.fetch_errors,
            "Score ingestion worker stopped"
        );
        stats
    }

    /// Decode one record and write it to both stores. Never acknowledges.
    pub async fn handle_record(&self, record: &StreamRecord) -> RecordOutcome {
        let event = match ScoreEvent::from_payload(record.payload.as_deref()) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    worker = self.worker,
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    key = ?record.key_str(),
                    error = %err,
                    "Skipping poison score record"
                );
                metrics::record_poison();
                return RecordOutcome::Poison;
            }
        };

        let fast_store_ok = match self.ranking.update(&event.subject_id, event.score).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    worker = self.worker,
                    subject_id = %event.subject_id,
                    score = event.score,
                    error = %err,
                    "Fast store update failed"
                );
                metrics::record_store_write_failure("fast");
                false
            }
        };

        let durable_store_ok = match self
            .leaderboard
            .upsert(&event.subject_id, &event.label, event.score)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!(
                    worker = self.worker,
                    subject_id = %event.subject_id,
                    score = event.score,
                    error = %err,
                    "Durable store upsert failed"
                );
                metrics::record_store_write_failure("durable");
                false
            }
        };

        metrics::record_applied();
        debug!(
            worker = self.worker,
            subject_id = %event.subject_id,
            score = event.score,
            partition = record.partition,
            offset = record.offset,
            fast_store_ok,
            durable_store_ok,
            "Applied score event"
        );

        RecordOutcome::Applied {
            fast_store_ok,
            durable_store_ok,
        }
    }

    async fn acknowledge<S>(&self, stream: &mut S, record: &StreamRecord, stats: &mut PipelineStats)
    where
        S: ScoreStream + ?Sized,
    {
        if let Err(err) = stream.commit(record).await {
            stats.commit_failures += 1;
            metrics::record_commit_failure();
            warn!(
                worker = self.worker,
                partition = record.partition,
                offset = record.offset,
                error = %err,
                "Failed to commit score record offset"
            );
        }
    }
}
