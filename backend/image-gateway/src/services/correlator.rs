//! Reply correlation
//!
//! Worker replies carry no request identifier, only a result locator, so a
//! reply is paired with a waiting request purely by arrival order: the
//! oldest open slot receives the next reply. Under concurrent load a request
//! may therefore receive the result of a different upload whenever the
//! worker completes jobs out of publish order. Fixing that requires a
//! correlation id in both the job and the reply payloads.
//!
//! Each waiting request owns a single-use slot backed by a
//! `tokio::sync::oneshot` channel. The registry of open slots is a FIFO
//! guarded by one mutex; delivery, timeout retirement, cancellation and
//! shutdown all mutate it under that lock, and the oneshot send happens
//! while the lock is held, so a slot is either delivered or retired, never
//! both.

use crate::metrics::CorrelatorMetrics;
use crate::models::ReplyMessage;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// How long an upload waits for its reply unless configured otherwise
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifier assigned to a slot at registration, increasing monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// No reply was delivered before the deadline
    #[error("Timed out after {0:?} waiting for a worker reply")]
    Timeout(Duration),

    /// The correlator shut down before a reply was delivered
    #[error("Reply correlator is closed")]
    Closed,
}

/// Outcome of routing one reply.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Delivered(SlotId),
    /// No slot was open; the reply is handed back to the caller
    Dropped(ReplyMessage),
}

struct SlotRegistry {
    next_id: u64,
    slots: VecDeque<(SlotId, oneshot::Sender<ReplyMessage>)>,
    closed: bool,
}

/// Routes replies from the shared subscription stream to waiting requests.
pub struct ResponseCorrelator {
    registry: Mutex<SlotRegistry>,
    reply_timeout: Duration,
    metrics: Option<CorrelatorMetrics>,
}

impl Default for ResponseCorrelator {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_TIMEOUT)
    }
}

impl ResponseCorrelator {
    pub fn new(reply_timeout: Duration) -> Self {
        Self {
            registry: Mutex::new(SlotRegistry {
                next_id: 0,
                slots: VecDeque::new(),
                closed: false,
            }),
            reply_timeout,
            metrics: None,
        }
    }

    /// Create a correlator that also keeps Prometheus metrics current.
    pub fn with_metrics(reply_timeout: Duration, metrics: CorrelatorMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(reply_timeout)
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Open a slot at the back of the queue.
    ///
    /// Register before publishing the job, otherwise a fast worker's reply
    /// can arrive while no slot is open and be dropped.
    pub fn register(self: &Arc<Self>) -> Result<PendingReply, CorrelationError> {
        let (sender, receiver) = oneshot::channel();

        let slot = {
            let mut registry = self.registry.lock();
            if registry.closed {
                return Err(CorrelationError::Closed);
            }
            let slot = SlotId(registry.next_id);
            registry.next_id += 1;
            registry.slots.push_back((slot, sender));
            self.record_pending(registry.slots.len());
            slot
        };

        debug!(%slot, "Registered reply slot");

        Ok(PendingReply {
            slot,
            receiver,
            correlator: Arc::clone(self),
        })
    }

    /// Hand `reply` to the oldest open slot.
    ///
    /// Slots whose receiver is already gone are discarded on the way.
    pub fn dispatch(&self, reply: ReplyMessage) -> Dispatch {
        let mut registry = self.registry.lock();
        let mut reply = reply;

        while let Some((slot, sender)) = registry.slots.pop_front() {
            match sender.send(reply) {
                Ok(()) => {
                    self.record_pending(registry.slots.len());
                    if let Some(metrics) = &self.metrics {
                        metrics.delivered.inc();
                    }
                    return Dispatch::Delivered(slot);
                }
                Err(returned) => {
                    debug!(%slot, "Reply slot abandoned, trying next");
                    reply = returned;
                }
            }
        }

        self.record_pending(0);
        if let Some(metrics) = &self.metrics {
            metrics.dropped.inc();
        }
        Dispatch::Dropped(reply)
    }

    /// Drain `replies` until it ends, then close the correlator.
    ///
    /// This is the only writer into slots; run exactly one per process.
    pub async fn run<S>(self: Arc<Self>, replies: S)
    where
        S: Stream<Item = ReplyMessage>,
    {
        futures::pin_mut!(replies);
        info!("Reply correlation loop started");

        while let Some(reply) = replies.next().await {
            match self.dispatch(reply) {
                Dispatch::Delivered(slot) => {
                    debug!(%slot, "Reply delivered");
                }
                Dispatch::Dropped(reply) => {
                    warn!(
                        result_locator = %reply.result_locator,
                        "No request waiting for reply, dropping it"
                    );
                }
            }
        }

        self.close();
        info!("Reply stream ended, correlator closed");
    }

    /// Refuse new registrations and wake every waiter with `Closed`.
    pub fn close(&self) {
        let drained = {
            let mut registry = self.registry.lock();
            registry.closed = true;
            let drained = registry.slots.len();
            registry.slots.clear();
            self.record_pending(0);
            drained
        };

        if drained > 0 {
            warn!(drained, "Correlator closed with requests still waiting");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.registry.lock().closed
    }

    /// Number of open slots
    pub fn pending(&self) -> usize {
        self.registry.lock().slots.len()
    }

    /// Remove `slot` if it is still open. Returns whether it was.
    fn retire(&self, slot: SlotId) -> bool {
        let mut registry = self.registry.lock();
        match registry.slots.iter().position(|(id, _)| *id == slot) {
            Some(index) => {
                registry.slots.remove(index);
                self.record_pending(registry.slots.len());
                true
            }
            None => false,
        }
    }

    fn record_pending(&self, len: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.pending.set(len as i64);
        }
    }
}

/// A request's claim on exactly one future reply.
///
/// Dropping the handle retires its slot, so a cancelled request never
/// swallows a reply meant for the next one in line.
pub struct PendingReply {
    slot: SlotId,
    receiver: oneshot::Receiver<ReplyMessage>,
    correlator: Arc<ResponseCorrelator>,
}

impl PendingReply {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Wait for delivery or the correlator's reply timeout, whichever is first.
    pub async fn wait(mut self) -> Result<ReplyMessage, CorrelationError> {
        let timeout = self.correlator.reply_timeout;

        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(CorrelationError::Closed),
            Err(_) => {
                if self.correlator.retire(self.slot) {
                    if let Some(metrics) = &self.correlator.metrics {
                        metrics.timeouts.inc();
                    }
                    warn!(slot = %self.slot, ?timeout, "Timed out waiting for worker reply");
                    return Err(CorrelationError::Timeout(timeout));
                }

                // The slot left the registry before we could retire it: the
                // loop delivered under the lock, or close() drained it.
                self.receiver
                    .try_recv()
                    .map_err(|_| CorrelationError::Closed)
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.correlator.retire(self.slot);
    }
}
