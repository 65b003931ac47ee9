//! Broker gateway
//!
//! Publishes job descriptors to the job topic and exposes the reply topic as
//! a single long-lived stream of `ReplyMessage`s. The transport sits behind
//! the `Broker` trait: Kafka in production, an in-process broker in tests.

use crate::models::{JobDescriptor, ReplyMessage};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub mod client;
pub mod memory;

pub use client::KafkaBroker;
pub use memory::InMemoryBroker;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Reply topic already has a subscriber")]
    AlreadySubscribed,

    #[error("Broker gateway is closed")]
    Closed,
}

/// Raw payloads read from one topic. Per-poll failures are items, not the end
/// of the stream.
pub type PayloadStream = BoxStream<'static, Result<Vec<u8>, BrokerError>>;

/// Decoded replies; ends only when the gateway is closed.
pub type ReplyStream = BoxStream<'static, ReplyMessage>;

/// Publish/subscribe transport.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BrokerError>;

    fn subscribe(&self, topic: &str) -> Result<PayloadStream, BrokerError>;

    /// Deliver anything still queued for publishing.
    async fn flush(&self) {}
}

/// Topic names used by the gateway.
#[derive(Clone, Debug)]
pub struct BrokerTopics {
    pub jobs: String,
    pub replies: String,
}

/// Owns the broker connection and its shutdown signal.
pub struct BrokerGateway {
    broker: Arc<dyn Broker>,
    topics: BrokerTopics,
    shutdown: watch::Sender<bool>,
    subscribed: AtomicBool,
}

impl BrokerGateway {
    pub fn new(broker: Arc<dyn Broker>, topics: BrokerTopics) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            broker,
            topics,
            shutdown,
            subscribed: AtomicBool::new(false),
        }
    }

    pub fn topics(&self) -> &BrokerTopics {
        &self.topics
    }

    /// Serialize `job` and send it to the job topic.
    pub async fn publish(&self, job: &JobDescriptor) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }

        let payload = serde_json::to_vec(job)?;
        self.broker.publish(&self.topics.jobs, &payload).await?;

        info!(
            image = %job.image_locator,
            topic = %self.topics.jobs,
            "Job published"
        );
        Ok(())
    }

    /// Open the reply stream. Can be called once per gateway.
    ///
    /// Malformed payloads and failed polls are logged and skipped. The
    /// stream ends as soon as [`BrokerGateway::close`] is called, even if a
    /// poll is outstanding.
    pub fn subscribe(&self) -> Result<ReplyStream, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(BrokerError::AlreadySubscribed);
        }

        let payloads = self.broker.subscribe(&self.topics.replies)?;
        let mut shutdown = self.shutdown.subscribe();
        let stopped = async move {
            loop {
                if *shutdown.borrow_and_update() {
                    break;
                }
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        };

        let topic = self.topics.replies.clone();
        info!(topic = %topic, "Subscribed to reply topic");

        let replies = payloads
            .take_until(stopped)
            .filter_map(move |item| futures::future::ready(decode_reply(item, &topic)));

        Ok(replies.boxed())
    }

    /// Signal shutdown. Idempotent.
    ///
    /// Ends the reply stream and refuses further publishes. Queued publishes
    /// are delivered by [`BrokerGateway::flush`].
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Broker gateway closed");
        }
    }

    /// Wait for the transport to deliver queued publishes.
    pub async fn flush(&self) {
        self.broker.flush().await;
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

fn decode_reply(item: Result<Vec<u8>, BrokerError>, topic: &str) -> Option<ReplyMessage> {
    let payload = match item {
        Ok(payload) => payload,
        Err(e) => {
            warn!(topic = %topic, error = %e, "Reply poll failed, continuing");
            return None;
        }
    };

    match serde_json::from_slice::<ReplyMessage>(&payload) {
        Ok(reply) if reply.result_locator.is_empty() => {
            warn!(topic = %topic, "Reply has an empty result locator, skipping");
            None
        }
        Ok(reply) => {
            debug!(topic = %topic, result_locator = %reply.result_locator, "Reply received");
            Some(reply)
        }
        Err(e) => {
            warn!(topic = %topic, error = %e, "Failed to parse reply payload, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_reply() {
        let reply = decode_reply(Ok(br#"{"updated_image_url":"bar.png"}"#.to_vec()), "replies");
        assert_eq!(reply, Some(ReplyMessage::new("bar.png")));
    }

    #[test]
    fn test_decode_skips_garbage() {
        assert_eq!(decode_reply(Ok(b"not json".to_vec()), "replies"), None);
        assert_eq!(decode_reply(Ok(Vec::new()), "replies"), None);
        assert_eq!(
            decode_reply(Ok(br#"{"updated_image_url":""}"#.to_vec()), "replies"),
            None
        );
    }

    #[test]
    fn test_decode_skips_poll_errors() {
        let item = Err(BrokerError::Unavailable("broker down".to_string()));
        assert_eq!(decode_reply(item, "replies"), None);
    }
}
