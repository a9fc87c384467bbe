//! The publish side of the broadcast hub.
//!
//! `BroadcastHub` owns two things behind one lock:
//! 1. The backlog: a `VecDeque` holding the most recent records, capped at
//!    the replay capacity, evicting the oldest entry on overflow
//! 2. The live channel: a `tokio::sync::broadcast` sender whose receivers
//!    each track their own read position
//!
//! Publishing appends to the backlog and sends on the channel in the same
//! critical section; subscribing snapshots the backlog and creates a
//! receiver in the same critical section. Every record therefore reaches a
//! subscriber either through its backlog snapshot or through its receiver,
//! never both and never neither.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::subscription::Subscription;

/// A published record tagged with its position in the global publish order.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    /// Emission order, starting at 0 and increasing by one per publish
    pub seq: u64,
    pub record: T,
}

struct Shared<T> {
    backlog: VecDeque<Event<T>>,
    capacity: usize,
    next_seq: u64,
    /// `None` once the hub is closed
    sender: Option<broadcast::Sender<Event<T>>>,
}

/// Multi-producer, multi-subscriber hot stream with bounded replay.
///
/// Cloning a hub is cheap and every clone publishes into the same stream.
pub struct BroadcastHub<T> {
    shared: Arc<Mutex<Shared<T>>>,
    config: HubConfig,
}

impl<T> Clone for BroadcastHub<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            config: self.config,
        }
    }
}

impl<T: Clone + Send + 'static> BroadcastHub<T> {
    /// Create an empty hub
    pub fn new(config: HubConfig) -> Self {
        let capacity = config.replay.backlog_capacity();
        let (sender, _) = broadcast::channel(config.live_capacity.max(1));

        Self {
            shared: Arc::new(Mutex::new(Shared {
                backlog: VecDeque::with_capacity(capacity),
                capacity,
                next_seq: 0,
                sender: Some(sender),
            })),
            config,
        }
    }

    /// Publish a record to the backlog and to every attached subscriber.
    ///
    /// Never blocks on subscribers. When the backlog is full the oldest
    /// record is evicted to make room.
    ///
    /// # Returns
    /// The sequence number assigned to the record, or `HubError::Closed`
    /// after [`close`](Self::close).
    pub fn publish(&self, record: T) -> Result<u64, HubError> {
        let mut shared = self.shared.lock();
        if shared.sender.is_none() {
            return Err(HubError::Closed);
        }

        let seq = shared.next_seq;
        shared.next_seq += 1;
        let event = Event { seq, record };

        if shared.backlog.len() == shared.capacity {
            shared.backlog.pop_front();
        }
        shared.backlog.push_back(event.clone());

        // Sending with no receivers attached is not a failure: the record
        // is already retained in the backlog.
        let delivered = shared
            .sender
            .as_ref()
            .and_then(|sender| sender.send(event).ok())
            .unwrap_or(0);
        trace!(seq, delivered, "published record");

        Ok(seq)
    }

    /// Attach a new subscriber.
    ///
    /// The subscription first replays the current backlog (oldest first) and
    /// then yields every record published after this call, in order.
    pub fn subscribe(&self) -> Subscription<T> {
        let shared = self.shared.lock();
        let backlog: VecDeque<Event<T>> = shared.backlog.iter().cloned().collect();
        let receiver = shared.sender.as_ref().map(broadcast::Sender::subscribe);
        drop(shared);

        debug!(backlog = backlog.len(), "subscriber attached");
        Subscription::new(backlog, receiver)
    }

    /// Snapshot of the records currently retained for replay, oldest first.
    pub fn backlog(&self) -> Vec<T> {
        self.shared
            .lock()
            .backlog
            .iter()
            .map(|event| event.record.clone())
            .collect()
    }

    /// Number of live subscribers currently attached
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .lock()
            .sender
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Stop accepting records. Attached subscribers drain what they have
    /// already been sent and then end.
    pub fn close(&self) {
        if self.shared.lock().sender.take().is_some() {
            info!("broadcast hub closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().sender.is_none()
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}
