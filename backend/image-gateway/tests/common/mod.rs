//! Shared fixtures for image-gateway integration tests
//!
//! Wires the gateway, correlator and reply loop to the in-process broker and
//! blob store, and provides a fake worker that answers jobs on the job topic.
#![allow(dead_code)]

use futures::StreamExt;
use image_gateway::kafka::{Broker, BrokerGateway, BrokerTopics, InMemoryBroker};
use image_gateway::models::{JobDescriptor, ReplyMessage};
use image_gateway::services::{BlobStore, InMemoryBlobStore, ResponseCorrelator};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const JOB_TOPIC: &str = "image-jobs";
pub const REPLY_TOPIC: &str = "image-results";

pub struct Harness {
    pub broker: Arc<InMemoryBroker>,
    pub store: Arc<InMemoryBlobStore>,
    pub gateway: Arc<BrokerGateway>,
    pub correlator: Arc<ResponseCorrelator>,
    pub reply_loop: JoinHandle<()>,
}

impl Harness {
    /// Gateway subscribed to the reply topic with the loop already running.
    pub fn start(reply_timeout: Duration) -> Self {
        let broker = Arc::new(InMemoryBroker::new());
        let gateway = Arc::new(BrokerGateway::new(
            broker.clone(),
            BrokerTopics {
                jobs: JOB_TOPIC.to_string(),
                replies: REPLY_TOPIC.to_string(),
            },
        ));
        let correlator = Arc::new(ResponseCorrelator::new(reply_timeout));

        let replies = gateway.subscribe().expect("subscribe to reply topic");
        let reply_loop = tokio::spawn(Arc::clone(&correlator).run(replies));

        Self {
            broker,
            store: Arc::new(InMemoryBlobStore::new()),
            gateway,
            correlator,
            reply_loop,
        }
    }

    /// Publish a raw reply as the worker would.
    pub async fn reply(&self, result_locator: &str) {
        let payload = serde_json::to_vec(&ReplyMessage::new(result_locator)).expect("encode reply");
        self.broker
            .publish(REPLY_TOPIC, &payload)
            .await
            .expect("publish reply");
    }

    /// Close the gateway, wait for the reply loop to finish, then flush.
    pub async fn shutdown(self) {
        self.gateway.close();
        self.reply_loop.await.expect("reply loop task");
        self.gateway.flush().await;
    }
}

/// Worker that answers every job with `map(locator)`, in job order.
pub fn spawn_mapping_worker<F>(broker: Arc<InMemoryBroker>, map: F) -> JoinHandle<()>
where
    F: Fn(&str) -> String + Send + 'static,
{
    let mut jobs = broker.subscribe(JOB_TOPIC).expect("subscribe to job topic");
    tokio::spawn(async move {
        while let Some(Ok(payload)) = jobs.next().await {
            let job: JobDescriptor = serde_json::from_slice(&payload).expect("decode job");
            let reply = ReplyMessage::new(map(&job.image_locator));
            let payload = serde_json::to_vec(&reply).expect("encode reply");
            broker
                .publish(REPLY_TOPIC, &payload)
                .await
                .expect("publish reply");
        }
    })
}

/// Worker that stores a "processed" copy of each upload and replies with it.
pub fn spawn_processing_worker(
    broker: Arc<InMemoryBroker>,
    store: Arc<InMemoryBlobStore>,
) -> JoinHandle<()> {
    let mut jobs = broker.subscribe(JOB_TOPIC).expect("subscribe to job topic");
    tokio::spawn(async move {
        while let Some(Ok(payload)) = jobs.next().await {
            let job: JobDescriptor = serde_json::from_slice(&payload).expect("decode job");
            let original = store.get(&job.image_locator).await.expect("uploaded object");

            let mut processed = b"processed:".to_vec();
            processed.extend_from_slice(&original);
            let result = format!("processed_{}", job.image_locator);
            store
                .put(processed.into(), &result)
                .await
                .expect("store processed object");

            let payload = serde_json::to_vec(&ReplyMessage::new(result)).expect("encode reply");
            broker
                .publish(REPLY_TOPIC, &payload)
                .await
                .expect("publish reply");
        }
    })
}
