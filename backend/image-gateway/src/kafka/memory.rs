use super::{Broker, BrokerError, PayloadStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// In-process broker for tests and local runs.
///
/// Every subscriber of a topic receives every payload published after it
/// subscribed; nothing is retained for late subscribers.
#[derive(Default)]
pub struct InMemoryBroker {
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Vec<u8>>>>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    unavailable: AtomicBool,
    flushes: AtomicUsize,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail with `BrokerError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Payloads published to `topic`, oldest first
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Number of times the gateway asked for a flush
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .lock()
            .get(topic)
            .map(|subs| subs.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable(format!(
                "in-memory broker refused publish to '{topic}'"
            )));
        }

        self.published
            .lock()
            .push((topic.to_string(), payload.to_vec()));

        if let Some(subs) = self.subscribers.lock().get_mut(topic) {
            subs.retain(|sub| sub.send(payload.to_vec()).is_ok());
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<PayloadStream, BrokerError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(sender);

        let payloads = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|payload| (Ok(payload), receiver))
        });
        Ok(payloads.boxed())
    }

    async fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}
