use crate::error::StreamError;

/// One record fetched from the score stream, detached from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

impl StreamRecord {
    pub fn key_str(&self) -> Option<&str> {
        self.key
            .as_deref()
            .and_then(|key| std::str::from_utf8(key).ok())
    }
}

/// Ordered log of score records with an explicit consumption checkpoint.
///
/// `next_record` must be cancel-safe: dropping its future before completion
/// must not lose a record.
#[async_trait::async_trait]
pub trait ScoreStream: Send {
    /// Wait for the next record. `Ok(None)` means the stream has ended.
    async fn next_record(&mut self) -> Result<Option<StreamRecord>, StreamError>;

    /// Advance the checkpoint past `record`.
    async fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError>;
}
