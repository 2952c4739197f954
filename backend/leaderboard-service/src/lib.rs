//! Leaderboard Service Library
//!
//! Consumes score events, keeps a live ranking in Redis and an authoritative
//! leaderboard in PostgreSQL, and periodically reconciles durable ranks.

pub mod config;
pub mod consumers;
pub mod domain;
pub mod error;
pub mod http;
pub mod jobs;
pub mod metrics;
pub mod repository;

pub use config::Config;
pub use consumers::{IngestionPipeline, PipelineStats, RecordOutcome, ScoreStream, StreamRecord};
pub use domain::{LeaderboardRow, ScoreEvent};
pub use error::{EventError, ReconcileError, ServiceError, StoreError, StreamError};
pub use jobs::{RankReconciler, ReconcileReport};
pub use repository::{LeaderboardStore, RankingStore};
