use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// One score observation read from the stream.
///
/// Expected payload:
/// ```json
/// { "subject_id": "3f1c…", "label": "Alice", "score": 120 }
/// ```
/// The game service publishes the same shape as `user_id` / `user_name`,
/// which is accepted too. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    #[serde(alias = "user_id")]
    pub subject_id: String,

    #[serde(alias = "user_name")]
    pub label: String,

    pub score: i64,
}

impl ScoreEvent {
    pub fn new(subject_id: impl Into<String>, label: impl Into<String>, score: i64) -> Self {
        Self {
            subject_id: subject_id.into(),
            label: label.into(),
            score,
        }
    }

    /// Decode and validate a record payload.
    ///
    /// Any error returned here classifies the record as poison.
    pub fn from_payload(payload: Option<&[u8]>) -> Result<Self, EventError> {
        let payload = payload.ok_or(EventError::MissingPayload)?;
        let event: ScoreEvent = serde_json::from_slice(payload)?;
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.subject_id.is_empty() {
            return Err(EventError::Invalid("subject_id is empty".to_string()));
        }
        Ok(())
    }
}
