//! Raw chain extraction workflow.
//!
//! One run resolves the chain's RPC endpoint and batch size, builds the
//! extraction adapter, and hands both to the [`AdaptiveRetryLoop`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use gtp_core::defaults::INITIAL_THREADS;
use gtp_core::{
    AdapterFactory, AdapterParams, BlockStart, ChainConfigProvider, LoadParameters, Result,
    RetryReport,
};
use gtp_db::{Database, PoolConfig};

use crate::retry::AdaptiveRetryLoop;
use crate::schedule::ScheduledTask;

/// Extraction workflow for a single chain.
pub struct RawChainWorkflow {
    chain_name: String,
    initial_threads: u32,
    block_start: BlockStart,
    retry_loop: AdaptiveRetryLoop,
    adapter_factory: Arc<dyn AdapterFactory>,
}

impl RawChainWorkflow {
    pub fn new(chain_name: impl Into<String>, adapter_factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            chain_name: chain_name.into(),
            initial_threads: INITIAL_THREADS,
            block_start: BlockStart::Auto,
            retry_loop: AdaptiveRetryLoop::new(),
            adapter_factory,
        }
    }

    /// Concurrency for the first attempt of every run.
    pub fn with_initial_threads(mut self, threads: u32) -> Self {
        self.initial_threads = threads;
        self
    }

    pub fn with_block_start(mut self, block_start: BlockStart) -> Self {
        self.block_start = block_start;
        self
    }

    pub fn with_retry_loop(mut self, retry_loop: AdaptiveRetryLoop) -> Self {
        self.retry_loop = retry_loop;
        self
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    pub fn initial_threads(&self) -> u32 {
        self.initial_threads
    }

    /// Execute one extraction run.
    ///
    /// Load parameters are rebuilt from configuration on every call, so each
    /// run starts again at the initial thread count.
    pub async fn run(&self, provider: &dyn ChainConfigProvider) -> Result<RetryReport> {
        let config = provider.chain_config(&self.chain_name).await?;
        let rpc_url = config.primary_rpc_url()?.to_string();
        info!(chain = %self.chain_name, rpc_url = %rpc_url, "RPC_URL={}", rpc_url);

        let mut params =
            LoadParameters::new(self.block_start, config.batch_size, self.initial_threads)?;

        let adapter = self.adapter_factory.build(AdapterParams {
            chain: self.chain_name.clone(),
            rpc_url,
        })?;

        self.retry_loop.run(adapter.as_ref(), &mut params).await
    }
}

/// Scheduled task that runs a workflow against a per-run database connector.
///
/// The connector is opened at the start of every run and closed before the
/// run returns, whatever its outcome. An attempt cancelled by the scheduler's
/// execution timeout never reaches `close()`; dropping the connector drops
/// the pool, which disconnects its connections.
pub struct DbRawTask {
    name: String,
    database_url: String,
    pool_config: PoolConfig,
    workflow: RawChainWorkflow,
}

impl DbRawTask {
    pub fn new(database_url: impl Into<String>, workflow: RawChainWorkflow) -> Self {
        Self {
            name: format!("run_{}", workflow.chain_name()),
            database_url: database_url.into(),
            pool_config: PoolConfig::default(),
            workflow,
        }
    }

    pub fn with_pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }
}

#[async_trait]
impl ScheduledTask for DbRawTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<()> {
        let db = Database::connect_with_config(&self.database_url, self.pool_config.clone()).await?;
        let result = self.workflow.run(&db).await;
        db.close().await;

        let report = result?;
        info!(
            chain = %self.workflow.chain_name(),
            attempts = report.attempts,
            reductions = report.reductions,
            final_threads = report.final_threads,
            "Raw extraction run finished"
        );
        Ok(())
    }
}
