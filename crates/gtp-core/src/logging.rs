//! Structured logging field names for gtp.
//!
//! All crates use these names for consistent structured logging fields so
//! log aggregation can query runs across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run failed terminally, alert dispatched |
//! | WARN  | Recoverable issue, concurrency reduced or attempt retried |
//! | INFO  | Lifecycle events (startup, shutdown), run completions |
//! | DEBUG | Decision points, resolved configuration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID of a scheduled run (UUIDv7).
pub const RUN_ID: &str = "run_id";

/// Subsystem originating the log event.
/// Values: "jobs", "database", "alert"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "retry_loop", "scheduler", "pool", "command_adapter"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Extraction fields ─────────────────────────────────────────────────────

/// Chain being extracted.
pub const CHAIN: &str = "chain";

/// RPC endpoint used for extraction.
pub const RPC_URL: &str = "rpc_url";

/// Current extraction concurrency.
pub const THREADS: &str = "threads";

/// Extraction batch size.
pub const BATCH_SIZE: &str = "batch_size";

/// 1-indexed attempt number (retry loop or scheduler).
pub const ATTEMPT: &str = "attempt";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
