//! Chain configuration repository.
//!
//! Reads the active RPC endpoints and extraction batch size for a chain from
//! `sys_rpc_config` and `sys_chain_config`.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use gtp_core::{ChainConfig, ChainConfigProvider, Error, Result, RpcEndpoint};

/// PostgreSQL implementation of ChainConfigProvider.
pub struct PgChainConfigRepository {
    pool: Pool<Postgres>,
}

impl PgChainConfigRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Active RPC endpoints for a chain, ordered by URL.
    pub async fn rpc_endpoints(&self, chain_name: &str) -> Result<Vec<RpcEndpoint>> {
        let rows = sqlx::query(
            "SELECT url, workers FROM sys_rpc_config
             WHERE origin_key = $1 AND active = true
             ORDER BY url",
        )
        .bind(chain_name)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| RpcEndpoint {
                url: r.get("url"),
                workers: r
                    .get::<Option<i32>, _>("workers")
                    .and_then(|w| u32::try_from(w).ok()),
            })
            .collect())
    }

    /// Raw batch size column for a chain, if the chain is configured.
    pub async fn batch_size(&self, chain_name: &str) -> Result<Option<i32>> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT batch_size FROM sys_chain_config WHERE origin_key = $1")
                .bind(chain_name)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(row.map(|(batch_size,)| batch_size))
    }
}

#[async_trait]
impl ChainConfigProvider for PgChainConfigRepository {
    async fn chain_config(&self, chain_name: &str) -> Result<ChainConfig> {
        let rpc_endpoints = self.rpc_endpoints(chain_name).await?;
        let batch_size = self.batch_size(chain_name).await?;
        let config = build_chain_config(chain_name, rpc_endpoints, batch_size)?;

        debug!(
            subsystem = "database",
            component = "chain_config",
            chain = chain_name,
            rpc_count = config.rpc_endpoints.len(),
            batch_size = config.batch_size,
            "Loaded chain configuration"
        );
        Ok(config)
    }
}

/// Validate raw lookup results into a [`ChainConfig`].
pub fn build_chain_config(
    chain_name: &str,
    rpc_endpoints: Vec<RpcEndpoint>,
    batch_size: Option<i32>,
) -> Result<ChainConfig> {
    let batch_size = batch_size
        .ok_or_else(|| Error::Config(format!("no chain config row for {chain_name}")))?;
    let batch_size = u32::try_from(batch_size)
        .ok()
        .filter(|b| *b > 0)
        .ok_or_else(|| {
            Error::Config(format!(
                "batch_size for {chain_name} must be positive, got {batch_size}"
            ))
        })?;

    if rpc_endpoints.is_empty() {
        return Err(Error::Config(format!(
            "no active RPC endpoints for {chain_name}"
        )));
    }

    Ok(ChainConfig {
        chain_name: chain_name.to_string(),
        rpc_endpoints,
        batch_size,
    })
}
