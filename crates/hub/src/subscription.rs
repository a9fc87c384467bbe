//! Per-subscriber delivery.
//!
//! A `Subscription` moves through four states:
//!
//! ```text
//! Attached ──► Replaying ──► Live ──► Closed
//!     └────────────────────────┘
//!       (empty backlog)
//! ```
//!
//! Dropping a subscription detaches it from the hub and releases its cursor.

use std::collections::VecDeque;

use futures::Stream;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use crate::hub::Event;

/// Where a subscriber is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Just subscribed, nothing delivered yet
    Attached,
    /// Draining the backlog snapshot taken at attach time
    Replaying,
    /// Receiving records as they are published
    Live,
    /// The hub closed and everything has been delivered
    Closed,
}

/// Receiving side of a [`BroadcastHub`](crate::BroadcastHub).
pub struct Subscription<T> {
    backlog: VecDeque<Event<T>>,
    receiver: Option<broadcast::Receiver<Event<T>>>,
    state: SubscriberState,
    skipped: u64,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub(crate) fn new(
        backlog: VecDeque<Event<T>>,
        receiver: Option<broadcast::Receiver<Event<T>>>,
    ) -> Self {
        Self {
            backlog,
            receiver,
            state: SubscriberState::Attached,
            skipped: 0,
        }
    }

    /// Wait for the next record.
    ///
    /// Returns `None` once the hub has been closed and every record sent
    /// before the close has been delivered. Cancel safe.
    pub async fn recv(&mut self) -> Option<Event<T>> {
        if let Some(event) = self.next_from_backlog() {
            return Some(event);
        }

        loop {
            let result = match self.receiver.as_mut() {
                Some(receiver) => {
                    self.state = SubscriberState::Live;
                    receiver.recv().await
                }
                None => {
                    self.state = SubscriberState::Closed;
                    return None;
                }
            };

            match result {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => {
                    self.receiver = None;
                }
            }
        }
    }

    /// Take the next record if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<Event<T>> {
        if let Some(event) = self.next_from_backlog() {
            return Some(event);
        }

        loop {
            let result = match self.receiver.as_mut() {
                Some(receiver) => receiver.try_recv(),
                None => {
                    self.state = SubscriberState::Closed;
                    return None;
                }
            };

            match result {
                Ok(event) => {
                    self.state = SubscriberState::Live;
                    return Some(event);
                }
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) => {
                    self.state = SubscriberState::Live;
                    return None;
                }
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                }
            }
        }
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    /// Total records this subscriber missed by falling too far behind
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Turn the subscription into a `Stream` of events.
    pub fn into_stream(self) -> impl Stream<Item = Event<T>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|event| (event, subscription))
        })
    }

    fn next_from_backlog(&mut self) -> Option<Event<T>> {
        let event = self.backlog.pop_front()?;
        self.state = SubscriberState::Replaying;
        Some(event)
    }

    fn record_lag(&mut self, skipped: u64) {
        self.skipped += skipped;
        warn!(
            skipped,
            total_skipped = self.skipped,
            "Subscriber fell behind, oldest records dropped"
        );
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        debug!(state = ?self.state, skipped = self.skipped, "subscriber detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BroadcastHub, HubConfig, ReplayMode};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_state_transitions() {
        let hub: BroadcastHub<u32> =
            BroadcastHub::new(HubConfig::default().with_replay(ReplayMode::all(2)));
        hub.publish(1).unwrap();

        let mut subscription = hub.subscribe();
        assert_eq!(subscription.state(), SubscriberState::Attached);

        subscription.recv().await.unwrap();
        assert_eq!(subscription.state(), SubscriberState::Replaying);

        hub.publish(2).unwrap();
        subscription.recv().await.unwrap();
        assert_eq!(subscription.state(), SubscriberState::Live);

        hub.close();
        assert!(subscription.recv().await.is_none());
        assert_eq!(subscription.state(), SubscriberState::Closed);
    }

    #[tokio::test]
    async fn test_empty_backlog_goes_straight_live() {
        let hub: BroadcastHub<u32> = BroadcastHub::new(HubConfig::default());
        let mut subscription = hub.subscribe();

        assert!(subscription.try_recv().is_none());
        assert_eq!(subscription.state(), SubscriberState::Live);
    }

    #[tokio::test]
    async fn test_into_stream_yields_backlog_then_live() {
        let hub: BroadcastHub<&'static str> =
            BroadcastHub::new(HubConfig::default().with_replay(ReplayMode::all(2)));
        hub.publish("A").unwrap();
        hub.publish("B").unwrap();
        hub.publish("C").unwrap();

        let stream = hub.subscribe().into_stream();
        hub.publish("D").unwrap();
        hub.close();

        let records: Vec<&str> = stream.map(|event| event.record).collect().await;
        assert_eq!(records, vec!["B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_waiting_subscriber_wakes_on_publish() {
        let hub: BroadcastHub<u32> = BroadcastHub::new(HubConfig::default());
        let mut subscription = hub.subscribe();

        let waiter = tokio::spawn(async move { subscription.recv().await.map(|e| e.record) });
        tokio::task::yield_now().await;
        hub.publish(42).unwrap();

        assert_eq!(waiter.await.unwrap(), Some(42));
    }
}
