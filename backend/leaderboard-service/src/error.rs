/// Error types for leaderboard-service
use thiserror::Error;

/// Why a stream record could not become a [`ScoreEvent`](crate::domain::ScoreEvent).
///
/// Every variant is permanent: the record is acknowledged and dropped.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("record has no payload")]
    MissingPayload,

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid event: {0}")]
    Invalid(String),
}

/// Failure of a single store call. Treated as transient by the ingestion loop.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Stream error: {0}")]
    Other(String),
}

/// A reconciliation pass that was aborted before any rank was written.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("leaderboard scan failed: {0}")]
    Scan(#[source] StoreError),
}

/// Startup and wiring failures; these terminate the process.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

pub type StoreResult<T> = Result<T, StoreError>;
