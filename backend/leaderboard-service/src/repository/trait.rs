use crate::domain::LeaderboardRow;
use crate::error::StoreResult;

/// Fast ranking store: live order by score, last write per subject wins.
/// RedisRankingRepository implements this over a sorted set.
#[async_trait::async_trait]
pub trait RankingStore: Send + Sync {
    /// Set the subject's score (insert or overwrite)
    async fn update(&self, subject_id: &str, score: i64) -> StoreResult<()>;

    /// Health check (optional)
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Durable, authoritative leaderboard.
/// PostgresLeaderboardRepository implements this over the `leaderboard` table.
#[async_trait::async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Insert or update the subject's label and score. Never touches rank.
    async fn upsert(&self, subject_id: &str, label: &str, score: i64) -> StoreResult<()>;

    /// All rows, score descending then subject id ascending
    async fn scan_ordered_by_score_desc(&self) -> StoreResult<Vec<LeaderboardRow>>;

    /// Write the rank computed by a reconciliation pass
    async fn set_rank(&self, subject_id: &str, rank: i64) -> StoreResult<()>;

    /// Health check (optional)
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
