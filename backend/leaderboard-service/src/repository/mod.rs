mod postgres_leaderboard_repository;
mod redis_ranking_repository;
mod r#trait;

pub use postgres_leaderboard_repository::PostgresLeaderboardRepository;
pub use redis_ranking_repository::RedisRankingRepository;
pub use r#trait::{LeaderboardStore, RankingStore};
