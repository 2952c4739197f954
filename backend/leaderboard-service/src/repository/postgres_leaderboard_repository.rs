use sqlx::{PgPool, Row};
use tracing::debug;

use super::LeaderboardStore;
use crate::domain::LeaderboardRow;
use crate::error::StoreResult;

/// PostgreSQL leaderboard (source of truth)
#[derive(Clone)]
pub struct PostgresLeaderboardRepository {
    pool: PgPool,
}

impl PostgresLeaderboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl LeaderboardStore for PostgresLeaderboardRepository {
    async fn upsert(&self, subject_id: &str, label: &str, score: i64) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard (subject_id, label, score, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (subject_id) DO UPDATE SET
                label = EXCLUDED.label,
                score = EXCLUDED.score,
                updated_at = NOW()
            "#,
        )
        .bind(subject_id)
        .bind(label)
        .bind(score)
        .execute(&self.pool)
        .await?;

        debug!(subject_id = %subject_id, score, "Upserted leaderboard row");
        Ok(())
    }

    async fn scan_ordered_by_score_desc(&self) -> StoreResult<Vec<LeaderboardRow>> {
        let rows = sqlx::query(
            r#"
            SELECT subject_id, score, rank
            FROM leaderboard
            ORDER BY score DESC, subject_id COLLATE "C" ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> StoreResult<LeaderboardRow> {
                Ok(LeaderboardRow {
                    subject_id: row.try_get("subject_id")?,
                    score: row.try_get("score")?,
                    rank: row.try_get("rank")?,
                })
            })
            .collect()
    }

    async fn set_rank(&self, subject_id: &str, rank: i64) -> StoreResult<()> {
        sqlx::query("UPDATE leaderboard SET rank = $1 WHERE subject_id = $2")
            .bind(rank)
            .bind(subject_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
