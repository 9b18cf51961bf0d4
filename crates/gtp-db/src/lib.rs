//! # gtp-db
//!
//! PostgreSQL database layer for raw chain extraction.
//!
//! This crate provides:
//! - Connection pool management
//! - The per-run [`Database`] connector with an explicit open/close lifecycle
//! - Chain configuration lookup (RPC endpoints and batch size)
//!
//! ## Example
//!
//! ```rust,ignore
//! use gtp_db::{ChainConfigProvider, Database};
//!
//! let db = Database::connect("postgres://localhost/gtp").await?;
//! let config = db.chain_config.chain_config("starknet").await?;
//! println!("RPC_URL={}", config.primary_rpc_url()?);
//! db.close().await;
//! ```

pub mod chain_config;
pub mod pool;

// Re-export core types
pub use gtp_core::*;

pub use chain_config::{build_chain_config, PgChainConfigRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Database connector for one workflow run.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Chain configuration lookup.
    pub chain_config: PgChainConfigRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            chain_config: PgChainConfigRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Close all pooled connections. Consumes the connector.
    pub async fn close(self) {
        log_pool_metrics(&self.pool);
        self.pool.close().await;
        tracing::debug!(
            subsystem = "database",
            component = "pool",
            op = "close",
            "Database connection pool closed"
        );
    }
}

#[async_trait::async_trait]
impl ChainConfigProvider for Database {
    async fn chain_config(&self, chain_name: &str) -> Result<ChainConfig> {
        self.chain_config.chain_config(chain_name).await
    }
}
