//! Command-line and environment configuration.
//!
//! Every tunable can be given as a flag or through the environment variable
//! shown in `--help`. The retry options are a separate `clap::Args` group so
//! other binaries can flatten them into their own parsers.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};
use hub::{HubConfig, ReplayMode};
use upstream_client::{Backoff, RetryPolicy, UpstreamConfig};

/// Movies service: movie-info and review catalogs plus the aggregated movie view
#[derive(Debug, Clone, Parser)]
#[command(name = "movies-server", version, long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "MOVIES_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Movie-info collection URL. Defaults to this server's own catalog.
    #[arg(long, env = "MOVIES_MOVIE_INFO_URL")]
    pub movie_info_url: Option<String>,

    /// Reviews collection URL. Defaults to this server's own catalog.
    #[arg(long, env = "MOVIES_REVIEWS_URL")]
    pub reviews_url: Option<String>,

    /// Per-request timeout for upstream calls, in milliseconds
    #[arg(long, env = "MOVIES_UPSTREAM_TIMEOUT_MS", default_value_t = 10_000)]
    pub upstream_timeout_ms: u64,

    #[command(flatten)]
    pub retry: RetryArgs,

    #[command(flatten)]
    pub feed: FeedArgs,
}

impl ServerConfig {
    /// Where the aggregator finds movie infos
    pub fn movie_info_url(&self) -> String {
        self.movie_info_url
            .clone()
            .unwrap_or_else(|| format!("{}/v1/movieinfos", self.self_url()))
    }

    /// Where the aggregator finds reviews
    pub fn reviews_url(&self) -> String {
        self.reviews_url
            .clone()
            .unwrap_or_else(|| format!("{}/v1/reviews", self.self_url()))
    }

    pub fn movie_info_upstream(&self) -> UpstreamConfig {
        self.upstream(self.movie_info_url())
    }

    pub fn reviews_upstream(&self) -> UpstreamConfig {
        self.upstream(self.reviews_url())
    }

    fn upstream(&self, url: String) -> UpstreamConfig {
        UpstreamConfig::new(url)
            .with_timeout(Duration::from_millis(self.upstream_timeout_ms))
            .with_retry(self.retry.policy())
    }

    /// Base URL of this server as seen from itself
    fn self_url(&self) -> String {
        let mut addr = self.bind;
        if addr.ip().is_unspecified() {
            addr.set_ip(match addr {
                SocketAddr::V4(_) => [127, 0, 0, 1].into(),
                SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
            });
        }
        format!("http://{addr}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Upstream retry options
#[derive(Debug, Clone, Args)]
pub struct RetryArgs {
    /// Retries after the first attempt on server or transport faults
    #[arg(long, env = "MOVIES_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "MOVIES_RETRY_DELAY_MS", default_value_t = 1_000)]
    pub retry_delay_ms: u64,

    #[arg(long, env = "MOVIES_BACKOFF", value_enum, default_value_t = BackoffKind::Fixed)]
    pub backoff: BackoffKind,

    /// Growth factor for exponential backoff
    #[arg(long, env = "MOVIES_BACKOFF_MULTIPLIER", default_value_t = 2.0)]
    pub backoff_multiplier: f64,

    /// Upper bound for exponential backoff, in milliseconds
    #[arg(long, env = "MOVIES_MAX_RETRY_DELAY_MS", default_value_t = 30_000)]
    pub max_retry_delay_ms: u64,

    /// Add up to 10% random delay to each retry
    #[arg(long, env = "MOVIES_RETRY_JITTER")]
    pub jitter: bool,
}

impl RetryArgs {
    pub fn policy(&self) -> RetryPolicy {
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::exponential(
                self.backoff_multiplier,
                Duration::from_millis(self.max_retry_delay_ms),
            ),
        };

        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_base_delay(Duration::from_millis(self.retry_delay_ms))
            .with_backoff(backoff)
            .with_jitter(self.jitter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplayKind {
    /// New subscribers get only the most recent record
    Latest,
    /// New subscribers get up to `--replay-capacity` recent records
    All,
}

/// Live feed options, shared by the movie-info and review hubs
#[derive(Debug, Clone, Args)]
pub struct FeedArgs {
    #[arg(long, env = "MOVIES_REPLAY", value_enum, default_value_t = ReplayKind::Latest)]
    pub replay: ReplayKind,

    /// Backlog size when `--replay all`
    #[arg(long, env = "MOVIES_REPLAY_CAPACITY", default_value_t = 256)]
    pub replay_capacity: usize,

    /// Records buffered per subscriber before the oldest are skipped
    #[arg(long, env = "MOVIES_LIVE_CAPACITY", default_value_t = 1024)]
    pub live_capacity: usize,
}

impl FeedArgs {
    pub fn hub_config(&self) -> HubConfig {
        let replay = match self.replay {
            ReplayKind::Latest => ReplayMode::Latest,
            ReplayKind::All => ReplayMode::all(self.replay_capacity),
        };
        HubConfig::default()
            .with_replay(replay)
            .with_live_capacity(self.live_capacity)
    }
}
