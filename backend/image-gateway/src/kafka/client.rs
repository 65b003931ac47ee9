use super::{Broker, BrokerError, PayloadStream};
use crate::config::KafkaConfig;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Pause after a failed poll so a dead broker does not spin the loop
const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How long a publish may sit in the producer queue
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on draining the producer at shutdown
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka transport.
pub struct KafkaBroker {
    producer: FutureProducer,
    consumer_config: ClientConfig,
    group_prefix: String,
}

impl KafkaBroker {
    pub fn new(config: &KafkaConfig) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| BrokerError::Unavailable(format!("Failed to create Kafka producer: {e}")))?;

        let mut consumer_config = ClientConfig::new();
        consumer_config
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "45000");

        info!(
            brokers = %config.brokers,
            client_id = %config.client_id,
            group_prefix = %config.consumer_group,
            "Kafka broker initialized"
        );

        Ok(Self {
            producer,
            consumer_config,
            group_prefix: config.consumer_group.clone(),
        })
    }
}

/// Consumer settings for one subscription.
///
/// Each subscription joins a fresh group and never commits, so a restarted
/// gateway starts at the end of the reply topic instead of replaying replies
/// nobody is waiting for, and every replica sees every reply.
fn subscription_config(base: &ClientConfig, group_prefix: &str) -> ClientConfig {
    let mut config = base.clone();
    config
        .set("group.id", format!("{}-{}", group_prefix, Uuid::new_v4()))
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "latest");
    config
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload);

        self.producer
            .send(record, DELIVERY_TIMEOUT)
            .await
            .map_err(|(err, _)| {
                BrokerError::Unavailable(format!("Failed to publish to '{topic}': {err}"))
            })?;

        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<PayloadStream, BrokerError> {
        let consumer_config = subscription_config(&self.consumer_config, &self.group_prefix);
        let group_id = consumer_config.get("group.id").unwrap_or_default().to_string();
        let consumer: StreamConsumer = consumer_config
            .create()
            .map_err(|e| BrokerError::Unavailable(format!("Failed to create Kafka consumer: {e}")))?;

        consumer.subscribe(&[topic]).map_err(|e| {
            BrokerError::Unavailable(format!("Failed to subscribe to topic '{topic}': {e}"))
        })?;

        info!(topic = %topic, group_id = %group_id, "Kafka consumer subscribed");

        let payloads = stream::unfold(Arc::new(consumer), |consumer| async move {
            let received = consumer
                .recv()
                .await
                .map(|message| message.payload().map(<[u8]>::to_vec).unwrap_or_default());

            let item = match received {
                Ok(payload) => Ok(payload),
                Err(e) => {
                    let err = BrokerError::Unavailable(format!("Kafka consumer error: {e}"));
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    Err(err)
                }
            };
            Some((item, consumer))
        });

        Ok(payloads.boxed())
    }

    async fn flush(&self) {
        // librdkafka's flush blocks the calling thread.
        let producer = self.producer.clone();
        let flushed = tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT)).await;

        match flushed {
            Ok(Ok(())) => info!("Kafka producer flushed"),
            Ok(Err(e)) => warn!(error = %e, "Failed to flush Kafka producer"),
            Err(e) => warn!(error = %e, "Kafka flush task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", "localhost:9092")
            .set("enable.auto.commit", "true");
        config
    }

    #[test]
    fn test_subscription_uses_fresh_group() {
        let base = base_config();
        let first = subscription_config(&base, "image-gateway");
        let second = subscription_config(&base, "image-gateway");

        let first_group = first.get("group.id").unwrap();
        let second_group = second.get("group.id").unwrap();
        assert!(first_group.starts_with("image-gateway-"));
        assert!(second_group.starts_with("image-gateway-"));
        assert_ne!(first_group, second_group);
    }

    #[test]
    fn test_subscription_never_commits() {
        let config = subscription_config(&base_config(), "image-gateway");
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("auto.offset.reset"), Some("latest"));
        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
    }
}
