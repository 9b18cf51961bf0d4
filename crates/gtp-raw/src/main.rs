//! gtp-raw: runs the `raw_starknet` extraction schedule.
//!
//! Every 15 minutes the scheduler opens a database connector, looks up the
//! chain's RPC endpoint and batch size, and runs the external extractor under
//! the adaptive-concurrency retry loop.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gtp_db::PoolConfig;
use gtp_jobs::{
    AdapterParams, AdaptiveRetryLoop, CommandExtractionAdapter, DbRawTask, ExtractionOperation,
    RawChainWorkflow, RawJobConfig, Result, Scheduler, WebhookAlert,
};

/// Connections needed by one run: config lookups only.
const RUN_MAX_CONNECTIONS: u32 = 2;

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily rolling file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "gtp_raw=info,gtp_jobs=info,gtp_db=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gtp_raw=info,gtp_jobs=info,gtp_db=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("gtp-raw.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

fn build_scheduler(config: &RawJobConfig) -> anyhow::Result<Scheduler> {
    let extractor_cmd = config.extractor_cmd.clone();
    let extractor_timeout = config.extractor_timeout;
    let factory = Arc::new(
        move |params: AdapterParams| -> Result<Box<dyn ExtractionOperation>> {
            Ok(Box::new(
                CommandExtractionAdapter::new(params)
                    .with_program(extractor_cmd.clone())
                    .with_timeout(extractor_timeout),
            ))
        },
    );

    let workflow = RawChainWorkflow::new(&config.chain_name, factory)
        .with_initial_threads(config.initial_threads)
        .with_block_start(config.block_start)
        .with_retry_loop(AdaptiveRetryLoop::new().with_cooldown(config.retry_cooldown));

    let task = DbRawTask::new(&config.database_url, workflow)
        .with_pool_config(PoolConfig::new().max_connections(RUN_MAX_CONNECTIONS));

    let mut scheduler = Scheduler::new(config.schedule_config(), Arc::new(task));

    match &config.alert_webhook_url {
        Some(url) => {
            let mut alert = WebhookAlert::new(url).context("Failed to build alert webhook")?;
            if let Some(secret) = &config.alert_webhook_secret {
                alert = alert.with_secret(secret);
            }
            info!(url = %alert.url(), "Failure alerts enabled");
            scheduler = scheduler.with_alert(Arc::new(alert));
        }
        None => warn!("ALERT_WEBHOOK_URL not set, failure alerts disabled"),
    }

    Ok(scheduler)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _log_guard = init_logging();

    let config = RawJobConfig::from_env();
    info!(
        chain = %config.chain_name,
        initial_threads = config.initial_threads,
        block_start = %config.block_start,
        extractor = %config.extractor_cmd,
        run_once = config.run_once,
        "Raw extraction configured"
    );

    let scheduler = build_scheduler(&config)?;

    if config.run_once {
        scheduler
            .run_once()
            .await
            .with_context(|| format!("{} run failed", scheduler.config().dag_id))?;
        return Ok(());
    }

    let handle = scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // The loop has already exited when the schedule is disabled.
    if let Err(e) = handle.shutdown().await {
        warn!(error = %e, "Scheduler already stopped");
    }
    handle.wait().await?;

    info!("gtp-raw stopped");
    Ok(())
}
