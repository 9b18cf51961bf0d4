//! Collaborator traits for raw chain extraction.
//!
//! These traits define the seams between the retry loop, the workflow, and
//! the outside world, enabling pluggable backends and testability.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// EXTRACTION
// =============================================================================

/// One extraction attempt against a chain node.
///
/// Implementations report wait-budget exhaustion as
/// [`Error::ResourceWaitExceeded`](crate::Error::ResourceWaitExceeded); any
/// other error is treated as non-retryable by the adaptive retry loop.
#[async_trait]
pub trait ExtractionOperation: Send + Sync {
    /// Extract raw data using the given load parameters.
    async fn extract_raw(&self, params: &LoadParameters) -> Result<()>;

    /// Human-readable name of this extraction operation.
    fn name(&self) -> &str;
}

/// Builds an extraction operation for a resolved chain endpoint.
pub trait AdapterFactory: Send + Sync {
    fn build(&self, params: AdapterParams) -> Result<Box<dyn ExtractionOperation>>;
}

impl<F> AdapterFactory for F
where
    F: Fn(AdapterParams) -> Result<Box<dyn ExtractionOperation>> + Send + Sync,
{
    fn build(&self, params: AdapterParams) -> Result<Box<dyn ExtractionOperation>> {
        self(params)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Supplies RPC endpoints and batch size for a named chain.
#[async_trait]
pub trait ChainConfigProvider: Send + Sync {
    async fn chain_config(&self, chain_name: &str) -> Result<ChainConfig>;
}

// =============================================================================
// TIME
// =============================================================================

/// Delay primitive used between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// =============================================================================
// ALERTING
// =============================================================================

/// Notified once a scheduled run has failed its final attempt.
#[async_trait]
pub trait FailureAlert: Send + Sync {
    async fn alert(&self, failure: &RunFailure) -> Result<()>;

    /// Human-readable name of this alert hook.
    fn name(&self) -> &str;
}
