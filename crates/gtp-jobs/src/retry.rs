//! Adaptive-concurrency retry loop around a single extraction operation.
//!
//! The loop recovers only [`Error::ResourceWaitExceeded`]: each occurrence
//! drops the extraction concurrency by one and waits out a cooldown before the
//! next attempt. At the concurrency floor the error is propagated so the
//! scheduler's own retry and alerting take over.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use gtp_core::defaults::{MIN_THREADS, RETRY_COOLDOWN_SECS};
use gtp_core::{
    Error, ExtractionOperation, LoadParameters, Result, RetryReport, Sleeper, TokioSleeper,
};

/// Drives an extraction operation under decreasing concurrency.
#[derive(Clone)]
pub struct AdaptiveRetryLoop {
    cooldown: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for AdaptiveRetryLoop {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(RETRY_COOLDOWN_SECS),
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

impl AdaptiveRetryLoop {
    /// Create a loop with the default 5-minute cooldown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cooldown between a resource-wait failure and the next attempt.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Replace the delay primitive.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Attempt extraction until it succeeds or concurrency is exhausted.
    ///
    /// `params.threads()` is decremented in place on every recovered
    /// failure, so on return it holds the concurrency of the last attempt.
    /// Errors other than `ResourceWaitExceeded` propagate immediately.
    #[instrument(skip_all, fields(operation = op.name()))]
    pub async fn run(
        &self,
        op: &dyn ExtractionOperation,
        params: &mut LoadParameters,
    ) -> Result<RetryReport> {
        let mut attempts: u32 = 0;
        let mut reductions: u32 = 0;

        loop {
            attempts += 1;
            debug!(
                attempt = attempts,
                threads = params.threads(),
                batch_size = params.batch_size,
                block_start = %params.block_start,
                "Starting extraction attempt"
            );

            match op.extract_raw(params).await {
                Ok(()) => {
                    info!(
                        attempt = attempts,
                        threads = params.threads(),
                        reductions,
                        "Extraction completed"
                    );
                    return Ok(RetryReport {
                        attempts,
                        reductions,
                        final_threads: params.threads(),
                    });
                }
                Err(e @ Error::ResourceWaitExceeded(_)) => {
                    warn!(
                        attempt = attempts,
                        threads = params.threads(),
                        error = %e,
                        "Extraction exceeded max wait time"
                    );

                    if !params.reduce_threads() {
                        error!(
                            attempt = attempts,
                            "Reached minimum thread count ({})",
                            MIN_THREADS
                        );
                        return Err(e);
                    }
                    reductions += 1;

                    warn!(
                        threads = params.threads(),
                        cooldown_secs = self.cooldown.as_secs(),
                        "Reducing threads to {} and retrying",
                        params.threads()
                    );
                    self.sleeper.sleep(self.cooldown).await;
                }
                Err(e) => {
                    debug!(attempt = attempts, error = %e, "Non-retryable extraction failure");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gtp_core::{logging, BlockStart};
    use std::sync::Mutex;

    /// Fails with resource-wait exhaustion until `threads` drops to `succeed_at`.
    struct ThresholdOp {
        succeed_at: u32,
        seen: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl ExtractionOperation for ThresholdOp {
        async fn extract_raw(&self, params: &LoadParameters) -> Result<()> {
            self.seen.lock().unwrap().push(params.threads());
            if params.threads() <= self.succeed_at {
                Ok(())
            } else {
                Err(Error::ResourceWaitExceeded(format!(
                    "{} workers waited too long",
                    params.threads()
                )))
            }
        }

        fn name(&self) -> &str {
            "threshold"
        }
    }

    #[derive(Default)]
    struct CountingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for CountingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_default_cooldown_is_five_minutes() {
        assert_eq!(AdaptiveRetryLoop::new().cooldown(), Duration::from_secs(300));
    }

    #[test]
    fn test_with_cooldown() {
        let retry = AdaptiveRetryLoop::new().with_cooldown(Duration::from_secs(5));
        assert_eq!(retry.cooldown(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_settles_on_first_working_concurrency() {
        let sleeper = Arc::new(CountingSleeper::default());
        let retry = AdaptiveRetryLoop::new()
            .with_cooldown(Duration::from_secs(42))
            .with_sleeper(sleeper.clone());
        let op = ThresholdOp {
            succeed_at: 3,
            seen: Mutex::new(Vec::new()),
        };
        let mut params = LoadParameters::new(BlockStart::Auto, 100, 5).unwrap();

        let report = retry.run(&op, &mut params).await.unwrap();

        assert_eq!(*op.seen.lock().unwrap(), vec![5, 4, 3]);
        assert_eq!(
            report,
            RetryReport {
                attempts: 3,
                reductions: 2,
                final_threads: 3,
            }
        );
        assert_eq!(params.threads(), 3);
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_secs(42), Duration::from_secs(42)]
        );
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_reduction_and_floor_are_logged() {
        let retry = AdaptiveRetryLoop::new().with_sleeper(Arc::new(CountingSleeper::default()));
        let op = ThresholdOp {
            succeed_at: 0,
            seen: Mutex::new(Vec::new()),
        };
        let mut params = LoadParameters::new(BlockStart::Auto, 10, 3).unwrap();

        retry.run(&op, &mut params).await.unwrap_err();

        assert!(logs_contain("Reducing threads to 2 and retrying"));
        assert!(logs_contain("Reducing threads to 1 and retrying"));
        assert!(logs_contain("Reached minimum thread count (1)"));
        assert!(!logs_contain("Reducing threads to 0"));
        assert!(logs_contain(&format!("{}=2", logging::THREADS)));
        assert!(logs_contain(&format!("{}=3", logging::ATTEMPT)));
    }

    #[tokio::test]
    async fn test_floor_failure_returns_original_error() {
        let sleeper = Arc::new(CountingSleeper::default());
        let retry = AdaptiveRetryLoop::new().with_sleeper(sleeper.clone());
        let op = ThresholdOp {
            succeed_at: 0,
            seen: Mutex::new(Vec::new()),
        };
        let mut params = LoadParameters::new(BlockStart::Block(9), 10, 2).unwrap();

        let err = retry.run(&op, &mut params).await.unwrap_err();

        assert!(err.is_resource_wait_exceeded());
        assert_eq!(err.to_string(), "Max wait time exceeded: 1 workers waited too long");
        assert_eq!(params.threads(), 1);
        assert_eq!(params.block_start, BlockStart::Block(9));
        assert_eq!(sleeper.0.lock().unwrap().len(), 1);
    }
}
