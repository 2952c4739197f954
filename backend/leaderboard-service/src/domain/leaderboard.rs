use serde::{Deserialize, Serialize};

/// A durable leaderboard row as seen by the rank scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub subject_id: String,
    pub score: i64,
    /// Rank written by the last reconciliation pass, if any
    pub rank: Option<i64>,
}

impl LeaderboardRow {
    pub fn new(subject_id: impl Into<String>, score: i64, rank: Option<i64>) -> Self {
        Self {
            subject_id: subject_id.into(),
            score,
            rank,
        }
    }
}

/// Rank computed for one subject during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    pub subject_id: String,
    pub rank: i64,
    pub previous_rank: Option<i64>,
}

impl RankAssignment {
    pub fn is_unchanged(&self) -> bool {
        self.previous_rank == Some(self.rank)
    }
}

/// Order rows by score descending, then subject id ascending (byte order), and
/// number them 1..=N.
pub fn assign_dense_ranks(mut rows: Vec<LeaderboardRow>) -> Vec<RankAssignment> {
    rows.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.subject_id.as_bytes().cmp(b.subject_id.as_bytes()))
    });

    rows.into_iter()
        .zip(1i64..)
        .map(|(row, rank)| RankAssignment {
            subject_id: row.subject_id,
            rank,
            previous_rank: row.rank,
        })
        .collect()
}
