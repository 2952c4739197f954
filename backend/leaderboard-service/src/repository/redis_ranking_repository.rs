use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::RankingStore;
use crate::error::{StoreError, StoreResult};

/// Largest magnitude a sorted-set score (an f64) holds exactly.
const MAX_EXACT_SCORE: u64 = 1 << 53;

/// Scores beyond 2^53 are rounded by Redis and may tie with neighbours.
fn exceeds_exact_score(score: i64) -> bool {
    score.unsigned_abs() > MAX_EXACT_SCORE
}

/// Redis sorted-set ranking store.
///
/// Members are subject ids and scores are the latest event score. Readers use
/// ZREVRANGE / ZREVRANK on `leaderboard_key` for descending standings.
#[derive(Clone)]
pub struct RedisRankingRepository {
    redis: ConnectionManager,
    leaderboard_key: String,
}

impl RedisRankingRepository {
    pub fn new(redis: ConnectionManager, leaderboard_key: impl Into<String>) -> Self {
        Self {
            redis,
            leaderboard_key: leaderboard_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl RankingStore for RedisRankingRepository {
    async fn update(&self, subject_id: &str, score: i64) -> StoreResult<()> {
        if exceeds_exact_score(score) {
            warn!(
                subject_id = %subject_id,
                score,
                key = %self.leaderboard_key,
                "Score exceeds 2^53; fast store value will be rounded and may drift from the durable store"
            );
        }

        let mut conn = self.redis.clone();
        let _: () = conn
            .zadd(&self.leaderboard_key, subject_id, score as f64)
            .await?;

        debug!(
            subject_id = %subject_id,
            score,
            key = %self.leaderboard_key,
            "Updated ranking entry"
        );
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        let pong: String = redis::cmd("PING")
            .query_async(&mut self.redis.clone())
            .await?;
        if pong != "PONG" {
            return Err(StoreError::Unavailable(format!(
                "unexpected PING reply: {}",
                pong
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect() -> ConnectionManager {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = redis::Client::open(url).expect("valid REDIS_URL");
        ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis")
    }

    #[test]
    fn test_exact_score_boundary() {
        assert!(!exceeds_exact_score(0));
        assert!(!exceeds_exact_score(1 << 53));
        assert!(!exceeds_exact_score(-(1 << 53)));
        assert!(exceeds_exact_score((1 << 53) + 1));
        assert!(exceeds_exact_score(-(1 << 53) - 1));
        assert!(exceeds_exact_score(i64::MIN));
        assert!(exceeds_exact_score(i64::MAX));
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_last_write_wins_and_descending_order() {
        let conn = connect().await;
        let key = "leaderboard:test:last_write_wins";
        let _: () = conn.clone().del(key).await.unwrap();

        let repo = RedisRankingRepository::new(conn.clone(), key);
        repo.update("A", 100).await.unwrap();
        repo.update("B", 150).await.unwrap();
        repo.update("A", 120).await.unwrap();
        // Idempotent re-apply
        repo.update("A", 120).await.unwrap();

        let standings: Vec<(String, f64)> =
            conn.clone().zrevrange_withscores(key, 0, -1).await.unwrap();
        assert_eq!(
            standings,
            vec![("B".to_string(), 150.0), ("A".to_string(), 120.0)]
        );

        let _: () = conn.clone().del(key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_health_check() {
        let repo = RedisRankingRepository::new(connect().await, "leaderboard:test:health");
        repo.health_check().await.unwrap();
    }
}
