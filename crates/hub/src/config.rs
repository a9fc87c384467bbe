//! Hub configuration.

use std::num::NonZeroUsize;

/// How much backlog a newly attached subscriber receives before going live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Only the single most recent record.
    #[default]
    Latest,
    /// Up to `capacity` of the most recent records, oldest first.
    All { capacity: NonZeroUsize },
}

impl ReplayMode {
    /// Bounded replay of the last `capacity` records (a capacity of 0 is treated as 1).
    pub fn all(capacity: usize) -> Self {
        ReplayMode::All {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Number of records retained for late subscribers.
    pub fn backlog_capacity(&self) -> usize {
        match self {
            ReplayMode::Latest => 1,
            ReplayMode::All { capacity } => capacity.get(),
        }
    }
}

/// Configuration for a [`BroadcastHub`](crate::BroadcastHub).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Backlog handed to new subscribers
    pub replay: ReplayMode,

    /// How far a live subscriber may fall behind before it starts skipping
    /// the oldest records. Rounded up to a power of two by tokio.
    pub live_capacity: usize,
}

impl HubConfig {
    /// Configure the replay mode (default: latest)
    pub fn with_replay(mut self, replay: ReplayMode) -> Self {
        self.replay = replay;
        self
    }

    /// Configure the per-subscriber live window (default: 1024)
    pub fn with_live_capacity(mut self, capacity: usize) -> Self {
        self.live_capacity = capacity.max(1);
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            replay: ReplayMode::default(),
            live_capacity: 1024,
        }
    }
}
