//! Data models for raw chain extraction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::defaults::MIN_THREADS;
use crate::error::{Error, Result};

// =============================================================================
// LOAD PARAMETERS
// =============================================================================

/// Where extraction should resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStart {
    /// Let the extractor resume after the last block it persisted.
    #[default]
    Auto,
    /// Resume at an explicit block number.
    Block(u64),
}

impl fmt::Display for BlockStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStart::Auto => write!(f, "auto"),
            BlockStart::Block(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for BlockStart {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(BlockStart::Auto);
        }
        s.parse::<u64>()
            .map(BlockStart::Block)
            .map_err(|_| Error::InvalidInput(format!("invalid block start: {s:?}")))
    }
}

impl Serialize for BlockStart {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BlockStart::Auto => serializer.serialize_str("auto"),
            BlockStart::Block(n) => serializer.serialize_u64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for BlockStart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(BlockStart::Block(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Mutable parameters for one extraction run.
///
/// `threads` is the only field that changes during a run; it never drops
/// below [`MIN_THREADS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadParameters {
    pub block_start: BlockStart,
    pub batch_size: u32,
    threads: u32,
}

impl LoadParameters {
    /// Build load parameters, rejecting a zero batch size or zero threads.
    pub fn new(block_start: BlockStart, batch_size: u32, threads: u32) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidInput("batch_size must be >= 1".to_string()));
        }
        if threads < MIN_THREADS {
            return Err(Error::InvalidInput(format!(
                "threads must be >= {MIN_THREADS}"
            )));
        }
        Ok(Self {
            block_start,
            batch_size,
            threads,
        })
    }

    /// Current extraction concurrency.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Whether concurrency is already at its floor.
    pub fn at_min_threads(&self) -> bool {
        self.threads <= MIN_THREADS
    }

    /// Decrement concurrency by one. Returns `false` (and changes nothing)
    /// when already at the floor.
    pub fn reduce_threads(&mut self) -> bool {
        if self.at_min_threads() {
            return false;
        }
        self.threads -= 1;
        true
    }
}

// =============================================================================
// CHAIN CONFIGURATION
// =============================================================================

/// A configured RPC endpoint for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub url: String,
    /// Worker hint stored alongside the endpoint, if any.
    #[serde(default)]
    pub workers: Option<u32>,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            workers: None,
        }
    }
}

/// Extraction configuration for a named chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_name: String,
    pub rpc_endpoints: Vec<RpcEndpoint>,
    pub batch_size: u32,
}

impl ChainConfig {
    /// URL of the first configured RPC endpoint.
    pub fn primary_rpc_url(&self) -> Result<&str> {
        self.rpc_endpoints
            .first()
            .map(|rpc| rpc.url.as_str())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no active RPC endpoints for {}",
                    self.chain_name
                ))
            })
    }

    /// All configured RPC URLs, in lookup order.
    pub fn rpc_urls(&self) -> Vec<&str> {
        self.rpc_endpoints.iter().map(|rpc| rpc.url.as_str()).collect()
    }
}

/// Parameters an extraction adapter is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterParams {
    pub chain: String,
    pub rpc_url: String,
}

// =============================================================================
// RUN OUTCOMES
// =============================================================================

/// Summary of a successful adaptive retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    /// Extraction attempts made, including the successful one.
    pub attempts: u32,
    /// Number of concurrency reductions (equals cooldowns taken).
    pub reductions: u32,
    /// Concurrency of the successful attempt.
    pub final_threads: u32,
}

/// Terminal failure of a scheduled run, as delivered to alert hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub dag_id: String,
    pub task: String,
    pub run_id: Uuid,
    /// Scheduler-level attempts made before giving up.
    pub attempts: u32,
    pub error: String,
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

/// Generate a new time-ordered run identifier.
#[inline]
pub fn new_run_id() -> Uuid {
    Uuid::now_v7()
}
