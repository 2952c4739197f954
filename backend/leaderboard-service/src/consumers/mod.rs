mod kafka_stream;
mod score_events;
mod stream;

pub use kafka_stream::KafkaScoreStream;
pub use score_events::{IngestionPipeline, PipelineStats, RecordOutcome};
pub use stream::{ScoreStream, StreamRecord};
