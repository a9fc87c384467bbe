//! # Hub Crate
//!
//! In-process broadcast of freshly written records to any number of
//! long-lived subscribers.
//!
//! ## Components
//!
//! - **config**: Replay mode (latest / bounded) and channel sizing
//! - **hub**: `BroadcastHub`, the publish side and owner of the backlog
//! - **subscription**: Per-subscriber cursor that replays backlog, then goes live
//! - **error**: Error types for the hub
//!
//! ## Example Usage
//!
//! ```ignore
//! use hub::{BroadcastHub, HubConfig, ReplayMode};
//!
//! let hub = BroadcastHub::new(HubConfig::default().with_replay(ReplayMode::all(2)));
//! hub.publish("A")?;
//! hub.publish("B")?;
//! hub.publish("C")?;
//!
//! // A late subscriber sees B, C and then everything published afterwards
//! let mut subscription = hub.subscribe();
//! while let Some(event) = subscription.recv().await {
//!     println!("#{} {}", event.seq, event.record);
//! }
//! ```
//!
//! ## Design
//!
//! The backlog is an owned `VecDeque` with a fixed capacity and a
//! drop-oldest eviction rule. Live delivery uses `tokio::sync::broadcast`,
//! which keeps one cursor per receiver: a slow subscriber falls behind and
//! skips the oldest records instead of holding up the producer or any other
//! subscriber. Both live behind a single mutex so that attaching a subscriber
//! and publishing a record are totally ordered with respect to each other.

pub mod config;
pub mod error;
pub mod hub;
pub mod subscription;

pub use config::{HubConfig, ReplayMode};
pub use error::HubError;
pub use hub::{BroadcastHub, Event};
pub use subscription::{SubscriberState, Subscription};
