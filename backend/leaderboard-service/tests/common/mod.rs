//! In-memory stand-ins for the stores and the score stream.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use leaderboard_service::domain::LeaderboardRow;
use leaderboard_service::error::{StoreError, StoreResult, StreamError};
use leaderboard_service::{LeaderboardStore, RankingStore, ScoreStream, StreamRecord};
use tokio::sync::Notify;

/// Every store and stream call in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    FastUpdate { subject_id: String, score: i64 },
    DurableUpsert { subject_id: String, score: i64 },
    Commit { offset: i64 },
}

pub type Journal = Arc<Mutex<Vec<Op>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn ops(journal: &Journal) -> Vec<Op> {
    journal.lock().unwrap().clone()
}

pub fn record(offset: i64, payload: &str) -> StreamRecord {
    StreamRecord {
        topic: "leaderboard-scores".to_string(),
        partition: 0,
        offset,
        key: None,
        payload: Some(payload.as_bytes().to_vec()),
    }
}

pub fn score_record(offset: i64, subject_id: &str, label: &str, score: i64) -> StreamRecord {
    record(
        offset,
        &format!(
            r#"{{"subject_id":"{}","label":"{}","score":{}}}"#,
            subject_id, label, score
        ),
    )
}

/// Fast store over a hash map.
pub struct MemoryRankingStore {
    entries: Mutex<HashMap<String, i64>>,
    fail_next: Mutex<u32>,
    journal: Journal,
}

impl MemoryRankingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(0),
            journal,
        }
    }

    pub fn fail_next_updates(&self, count: u32) {
        *self.fail_next.lock().unwrap() = count;
    }

    pub fn score(&self, subject_id: &str) -> Option<i64> {
        self.entries.lock().unwrap().get(subject_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Subjects by score descending, like a sorted-set reverse range.
    pub fn standings(&self) -> Vec<(String, i64)> {
        let mut entries: Vec<(String, i64)> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

#[async_trait::async_trait]
impl RankingStore for MemoryRankingStore {
    async fn update(&self, subject_id: &str, score: i64) -> StoreResult<()> {
        self.journal.lock().unwrap().push(Op::FastUpdate {
            subject_id: subject_id.to_string(),
            score,
        });

        {
            let mut fail_next = self.fail_next.lock().unwrap();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(StoreError::Unavailable("fast store down".into()));
            }
        }

        self.entries
            .lock()
            .unwrap()
            .insert(subject_id.to_string(), score);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub label: String,
    pub score: i64,
    pub rank: Option<i64>,
}

/// Holds an upsert open until the test releases it.
#[derive(Default)]
pub struct UpsertGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Durable store over an ordered map, with failure injection.
pub struct MemoryLeaderboardStore {
    rows: Mutex<BTreeMap<String, StoredRow>>,
    fail_next_upserts: Mutex<u32>,
    fail_scan: Mutex<bool>,
    failing_ranks: Mutex<HashSet<String>>,
    upsert_during_scan: Mutex<Option<(String, String, i64)>>,
    set_rank_calls: Mutex<u64>,
    gate: Mutex<Option<Arc<UpsertGate>>>,
    journal: Journal,
}

impl MemoryLeaderboardStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            fail_next_upserts: Mutex::new(0),
            fail_scan: Mutex::new(false),
            failing_ranks: Mutex::new(HashSet::new()),
            upsert_during_scan: Mutex::new(None),
            set_rank_calls: Mutex::new(0),
            gate: Mutex::new(None),
            journal,
        }
    }

    pub fn with_rows(rows: &[(&str, i64, Option<i64>)]) -> Self {
        let store = Self::new(journal());
        {
            let mut stored = store.rows.lock().unwrap();
            for (subject_id, score, rank) in rows {
                stored.insert(
                    subject_id.to_string(),
                    StoredRow {
                        label: subject_id.to_string(),
                        score: *score,
                        rank: *rank,
                    },
                );
            }
        }
        store
    }

    pub fn fail_next_upserts(&self, count: u32) {
        *self.fail_next_upserts.lock().unwrap() = count;
    }

    pub fn fail_scan(&self, fail: bool) {
        *self.fail_scan.lock().unwrap() = fail;
    }

    pub fn fail_rank_writes_for(&self, subject_id: &str) {
        self.failing_ranks
            .lock()
            .unwrap()
            .insert(subject_id.to_string());
    }

    pub fn clear_rank_failures(&self) {
        self.failing_ranks.lock().unwrap().clear();
    }

    /// Apply an upsert right after the next scan snapshot is taken.
    pub fn upsert_during_next_scan(&self, subject_id: &str, label: &str, score: i64) {
        *self.upsert_during_scan.lock().unwrap() =
            Some((subject_id.to_string(), label.to_string(), score));
    }

    pub fn gate_upserts(&self) -> Arc<UpsertGate> {
        let gate = Arc::new(UpsertGate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn row(&self, subject_id: &str) -> Option<StoredRow> {
        self.rows.lock().unwrap().get(subject_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set_rank_calls(&self) -> u64 {
        *self.set_rank_calls.lock().unwrap()
    }

    /// (subject, score, rank) ordered by rank, unranked rows last.
    pub fn ranked(&self) -> Vec<(String, i64, Option<i64>)> {
        let mut rows: Vec<(String, i64, Option<i64>)> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.score, v.rank))
            .collect();
        rows.sort_by_key(|(_, _, rank)| rank.unwrap_or(i64::MAX));
        rows
    }

    fn write_row(&self, subject_id: &str, label: &str, score: i64) {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(subject_id.to_string()).or_insert(StoredRow {
            label: String::new(),
            score,
            rank: None,
        });
        row.label = label.to_string();
        row.score = score;
    }
}

#[async_trait::async_trait]
impl LeaderboardStore for MemoryLeaderboardStore {
    async fn upsert(&self, subject_id: &str, label: &str, score: i64) -> StoreResult<()> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.journal.lock().unwrap().push(Op::DurableUpsert {
            subject_id: subject_id.to_string(),
            score,
        });

        {
            let mut fail_next = self.fail_next_upserts.lock().unwrap();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(StoreError::Unavailable("database down".into()));
            }
        }

        self.write_row(subject_id, label, score);
        Ok(())
    }

    async fn scan_ordered_by_score_desc(&self) -> StoreResult<Vec<LeaderboardRow>> {
        if *self.fail_scan.lock().unwrap() {
            return Err(StoreError::Unavailable("scan failed".into()));
        }

        let mut rows: Vec<LeaderboardRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| LeaderboardRow::new(k.clone(), v.score, v.rank))
            .collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.subject_id.as_bytes().cmp(b.subject_id.as_bytes()))
        });

        let concurrent = self.upsert_during_scan.lock().unwrap().take();
        if let Some((subject_id, label, score)) = concurrent {
            self.write_row(&subject_id, &label, score);
        }

        Ok(rows)
    }

    async fn set_rank(&self, subject_id: &str, rank: i64) -> StoreResult<()> {
        *self.set_rank_calls.lock().unwrap() += 1;

        if self.failing_ranks.lock().unwrap().contains(subject_id) {
            return Err(StoreError::Unavailable(format!(
                "rank write rejected for {}",
                subject_id
            )));
        }

        if let Some(row) = self.rows.lock().unwrap().get_mut(subject_id) {
            row.rank = Some(rank);
        }
        Ok(())
    }
}

/// Replays a fixed script of fetch results, then ends or waits forever.
pub struct ScriptedStream {
    script: VecDeque<Result<StreamRecord, StreamError>>,
    pending_when_drained: bool,
    fail_commits: bool,
    fetched: usize,
    committed: Vec<i64>,
    journal: Journal,
}

impl ScriptedStream {
    pub fn new(records: Vec<StreamRecord>, journal: Journal) -> Self {
        Self {
            script: records.into_iter().map(Ok).collect(),
            pending_when_drained: false,
            fail_commits: false,
            fetched: 0,
            committed: Vec::new(),
            journal,
        }
    }

    pub fn with_script(script: Vec<Result<StreamRecord, StreamError>>, journal: Journal) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::new(Vec::new(), journal)
        }
    }

    /// Block on fetch once the script is exhausted, like a live topic.
    pub fn pending_when_drained(mut self) -> Self {
        self.pending_when_drained = true;
        self
    }

    pub fn failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn committed(&self) -> &[i64] {
        &self.committed
    }
}

#[async_trait::async_trait]
impl ScoreStream for ScriptedStream {
    async fn next_record(&mut self) -> Result<Option<StreamRecord>, StreamError> {
        match self.script.pop_front() {
            Some(Ok(record)) => {
                self.fetched += 1;
                Ok(Some(record))
            }
            Some(Err(err)) => Err(err),
            None if self.pending_when_drained => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError> {
        self.journal.lock().unwrap().push(Op::Commit {
            offset: record.offset,
        });
        if self.fail_commits {
            return Err(StreamError::Other("commit rejected".into()));
        }
        self.committed.push(record.offset);
        Ok(())
    }
}
