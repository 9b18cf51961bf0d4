//! Centralized default constants for raw chain extraction.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// CHAIN
// =============================================================================

/// Chain extracted by the `raw_starknet` schedule.
pub const CHAIN_NAME: &str = "starknet";

// =============================================================================
// ADAPTIVE RETRY
// =============================================================================

/// Initial extraction concurrency for a run.
pub const INITIAL_THREADS: u32 = 1;

/// Minimum extraction concurrency. Exhaustion at this level is terminal.
pub const MIN_THREADS: u32 = 1;

/// Cooldown between a resource-wait failure and the next attempt (5 minutes).
pub const RETRY_COOLDOWN_SECS: u64 = 300;

// =============================================================================
// SCHEDULE
// =============================================================================

/// Identifier of the raw StarkNet schedule.
pub const SCHEDULE_DAG_ID: &str = "raw_starknet";

/// Human-readable schedule description.
pub const SCHEDULE_DESCRIPTION: &str = "Load raw tx data from StarkNet";

/// Tags attached to the schedule.
pub const SCHEDULE_TAGS: [&str; 3] = ["raw", "near-real-time", "rpc"];

/// Interval between scheduled runs (15 minutes).
pub const SCHEDULE_INTERVAL_SECS: u64 = 900;

/// Hard execution budget for one task attempt (45 minutes).
pub const SCHEDULE_EXECUTION_TIMEOUT_SECS: u64 = 2_700;

/// Additional scheduler-level attempts after a failed run attempt.
pub const SCHEDULE_RETRIES: u32 = 2;

/// Delay between scheduler-level attempts (5 minutes).
pub const SCHEDULE_RETRY_DELAY_SECS: u64 = 300;

/// Capacity of the scheduler event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// EXTRACTOR PROCESS
// =============================================================================

/// Default extractor program invoked by the command adapter.
pub const EXTRACTOR_CMD: &str = "gtp-extract-raw";

/// Timeout for a single extractor invocation (40 minutes).
///
/// Kept below the execution timeout so a hung extractor surfaces as a
/// `Timeout` from the adapter rather than a cancelled run.
pub const EXTRACTOR_TIMEOUT_SECS: u64 = 2_400;

/// Exit code the extractor uses to report resource-wait exhaustion (`EX_TEMPFAIL`).
pub const EXTRACTOR_EXIT_MAX_WAIT: i32 = 75;

/// Marker the extractor writes to stderr on resource-wait exhaustion.
pub const EXTRACTOR_MAX_WAIT_MARKER: &str = "MaxWaitTimeExceeded";

// =============================================================================
// ALERTING
// =============================================================================

/// Timeout for failure alert webhook delivery in seconds.
pub const ALERT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// DATABASE
// =============================================================================

/// Default database URL when `DATABASE_URL` is unset.
pub const DATABASE_URL: &str = "postgres://localhost/gtp";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_and_retries_fit_execution_budget() {
        // A run at the default initial concurrency never sleeps longer than
        // the per-attempt budget allows.
        let max_cooldowns = (INITIAL_THREADS - MIN_THREADS) as u64;
        assert!(max_cooldowns * RETRY_COOLDOWN_SECS < SCHEDULE_EXECUTION_TIMEOUT_SECS);
    }

    #[test]
    fn test_extractor_timeout_below_execution_timeout() {
        assert!(EXTRACTOR_TIMEOUT_SECS < SCHEDULE_EXECUTION_TIMEOUT_SECS);
    }

    #[test]
    fn test_schedule_interval_is_fifteen_minutes() {
        assert_eq!(SCHEDULE_INTERVAL_SECS, 15 * 60);
        assert_eq!(SCHEDULE_EXECUTION_TIMEOUT_SECS, 45 * 60);
    }
}
