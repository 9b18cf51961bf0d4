//! Environment configuration for the raw extraction job.

use std::time::Duration;

use gtp_core::defaults::{
    CHAIN_NAME, DATABASE_URL, EXTRACTOR_CMD, EXTRACTOR_TIMEOUT_SECS, INITIAL_THREADS, MIN_THREADS,
    RETRY_COOLDOWN_SECS,
};
use gtp_core::BlockStart;

use crate::schedule::ScheduleConfig;

/// Configuration for the raw extraction job.
#[derive(Debug, Clone)]
pub struct RawJobConfig {
    pub database_url: String,
    pub chain_name: String,
    /// Concurrency of the first attempt in every run.
    pub initial_threads: u32,
    pub block_start: BlockStart,
    pub retry_cooldown: Duration,
    pub extractor_cmd: String,
    pub extractor_timeout: Duration,
    pub schedule_enabled: bool,
    /// Execute a single scheduled run and exit.
    pub run_once: bool,
    pub alert_webhook_url: Option<String>,
    pub alert_webhook_secret: Option<String>,
}

impl Default for RawJobConfig {
    fn default() -> Self {
        Self {
            database_url: DATABASE_URL.to_string(),
            chain_name: CHAIN_NAME.to_string(),
            initial_threads: INITIAL_THREADS,
            block_start: BlockStart::Auto,
            retry_cooldown: Duration::from_secs(RETRY_COOLDOWN_SECS),
            extractor_cmd: EXTRACTOR_CMD.to_string(),
            extractor_timeout: Duration::from_secs(EXTRACTOR_TIMEOUT_SECS),
            schedule_enabled: true,
            run_once: false,
            alert_webhook_url: None,
            alert_webhook_secret: None,
        }
    }
}

impl RawJobConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DATABASE_URL` | `postgres://localhost/gtp` | Connector for chain configuration |
    /// | `RAW_CHAIN_NAME` | `starknet` | Chain to extract |
    /// | `RAW_INITIAL_THREADS` | `1` | Initial extraction concurrency (min 1) |
    /// | `RAW_BLOCK_START` | `auto` | Resume position, `auto` or a block number |
    /// | `RAW_RETRY_COOLDOWN_SECS` | `300` | Cooldown after a thread reduction |
    /// | `RAW_EXTRACTOR_CMD` | `gtp-extract-raw` | Extractor program |
    /// | `RAW_EXTRACTOR_TIMEOUT_SECS` | `2400` | Per-invocation extractor timeout |
    /// | `RAW_SCHEDULE_ENABLED` | `true` | Enable the periodic schedule |
    /// | `RAW_RUN_ONCE` | `false` | Run once and exit |
    /// | `ALERT_WEBHOOK_URL` | unset | Failure alert webhook |
    /// | `ALERT_WEBHOOK_SECRET` | unset | HMAC secret for alert payloads |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str, default: bool| {
            non_empty(key)
                .map(|v| v != "false" && v != "0")
                .unwrap_or(default)
        };
        let secs = |key: &str, default: Duration| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let initial_threads = non_empty("RAW_INITIAL_THREADS")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(INITIAL_THREADS)
            .max(MIN_THREADS);

        let block_start = non_empty("RAW_BLOCK_START")
            .and_then(|v| v.parse::<BlockStart>().ok())
            .unwrap_or(defaults.block_start);

        Self {
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            chain_name: non_empty("RAW_CHAIN_NAME").unwrap_or(defaults.chain_name),
            initial_threads,
            block_start,
            retry_cooldown: secs("RAW_RETRY_COOLDOWN_SECS", defaults.retry_cooldown),
            extractor_cmd: non_empty("RAW_EXTRACTOR_CMD").unwrap_or(defaults.extractor_cmd),
            extractor_timeout: secs("RAW_EXTRACTOR_TIMEOUT_SECS", defaults.extractor_timeout),
            schedule_enabled: flag("RAW_SCHEDULE_ENABLED", true),
            run_once: flag("RAW_RUN_ONCE", false),
            alert_webhook_url: non_empty("ALERT_WEBHOOK_URL"),
            alert_webhook_secret: non_empty("ALERT_WEBHOOK_SECRET"),
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_chain_name(mut self, chain: impl Into<String>) -> Self {
        self.chain_name = chain.into();
        self
    }

    /// Set initial concurrency. Values below 1 are raised to 1.
    pub fn with_initial_threads(mut self, threads: u32) -> Self {
        self.initial_threads = threads.max(MIN_THREADS);
        self
    }

    pub fn with_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.retry_cooldown = cooldown;
        self
    }

    pub fn with_extractor_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.extractor_cmd = cmd.into();
        self
    }

    pub fn with_run_once(mut self, run_once: bool) -> Self {
        self.run_once = run_once;
        self
    }

    /// Schedule registration for this chain.
    pub fn schedule_config(&self) -> ScheduleConfig {
        let config = ScheduleConfig::default().with_enabled(self.schedule_enabled);
        if self.chain_name == CHAIN_NAME {
            config
        } else {
            config
                .with_dag_id(format!("raw_{}", self.chain_name))
                .with_description(format!("Load raw tx data from {}", self.chain_name))
        }
    }
}
