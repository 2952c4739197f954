pub mod leaderboard;
pub mod score_event;

pub use leaderboard::{assign_dense_ranks, LeaderboardRow, RankAssignment};
pub use score_event::ScoreEvent;
