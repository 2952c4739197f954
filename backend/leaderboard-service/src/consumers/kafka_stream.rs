use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tracing::info;

use super::stream::{ScoreStream, StreamRecord};
use crate::config::KafkaConfig;
use crate::error::StreamError;

/// Kafka-backed score stream.
///
/// Auto-commit is disabled: offsets only advance through [`ScoreStream::commit`],
/// which the pipeline calls after both store writes were attempted.
pub struct KafkaScoreStream {
    consumer: StreamConsumer,
}

impl KafkaScoreStream {
    pub fn new(config: &KafkaConfig, worker: usize) -> Result<Self, StreamError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("client.id", format!("{}-{}", config.group_id, worker))
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set("max.poll.interval.ms", "300000")
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[config.topic.as_str()])?;
        info!(
            worker,
            brokers = %config.brokers,
            topic = %config.topic,
            group_id = %config.group_id,
            "Score stream consumer subscribed"
        );

        Ok(Self { consumer })
    }
}

#[async_trait::async_trait]
impl ScoreStream for KafkaScoreStream {
    async fn next_record(&mut self) -> Result<Option<StreamRecord>, StreamError> {
        let message = self.consumer.recv().await?;

        Ok(Some(StreamRecord {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
        }))
    }

    async fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &record.topic,
            record.partition,
            Offset::Offset(record.offset + 1),
        )?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }
}
