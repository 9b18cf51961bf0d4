//! Connection pools for per-run database connectors.
//!
//! A raw extraction run opens its own small pool, uses it for configuration
//! lookups, and closes it before the run returns. Pools are therefore sized
//! for a single run and never kept warm.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use gtp_core::{Error, Result};

/// Default maximum number of connections held by one run.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a connection, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds. Shorter than a schedule interval so an
/// abandoned run does not pin connections until the next one.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// `application_name` reported to PostgreSQL.
pub const DEFAULT_APPLICATION_NAME: &str = "gtp-raw";

/// Pool options for one run.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long to wait for the server before failing the run.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub application_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of connections. Zero is raised to one.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}

/// Open a pool with default options.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Open a pool with the given options.
///
/// The URL is parsed up front so a malformed `DATABASE_URL` fails with a
/// database error before any connection attempt.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let connect_options = PgConnectOptions::from_str(database_url)
        .map_err(Error::Database)?
        .application_name(&config.application_name);

    debug!(
        subsystem = "database",
        component = "pool",
        op = "open",
        host = connect_options.get_host(),
        database = connect_options.get_database().unwrap_or("(default)"),
        max_connections = config.max_connections,
        "Opening run connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "open",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Run connection pool opened"
    );
    Ok(pool)
}

/// Log pool usage, warning when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "database",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool usage"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            "All pooled connections are in use"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.application_name, "gtp-raw");
    }

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(30))
            .application_name("gtp-raw-test");

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.application_name, "gtp-raw-test");
    }

    #[test]
    fn test_zero_max_connections_is_raised() {
        assert_eq!(PoolConfig::new().max_connections(0).max_connections, 1);
    }

    #[tokio::test]
    async fn test_malformed_url_is_database_error() {
        let result = create_pool_with_config(
            "not-a-postgres-url",
            PoolConfig::new().acquire_timeout(Duration::from_secs(1)),
        )
        .await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
