//! # gtp-jobs
//!
//! Scheduled raw chain extraction.
//!
//! This crate provides:
//! - The adaptive-concurrency retry loop around one extraction operation
//! - The per-chain extraction workflow and its database-backed scheduled task
//! - An external-process extraction adapter
//! - A periodic scheduler with execution timeouts, retries and failure alerts
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gtp_jobs::{
//!     AdapterParams, CommandExtractionAdapter, DbRawTask, ExtractionOperation,
//!     RawChainWorkflow, RawJobConfig, Result, Scheduler,
//! };
//!
//! let config = RawJobConfig::from_env();
//! let factory = Arc::new(|params: AdapterParams| -> Result<Box<dyn ExtractionOperation>> {
//!     Ok(Box::new(CommandExtractionAdapter::new(params)))
//! });
//! let workflow = RawChainWorkflow::new(&config.chain_name, factory)
//!     .with_initial_threads(config.initial_threads);
//! let task = Arc::new(DbRawTask::new(&config.database_url, workflow));
//!
//! let handle = Scheduler::new(config.schedule_config(), task).start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod adapters;
pub mod alert;
pub mod config;
pub mod retry;
pub mod schedule;
pub mod workflow;

// Re-export core types
pub use gtp_core::*;

pub use adapters::{classify_exit, CommandExtractionAdapter};
pub use alert::{sign_payload, WebhookAlert};
pub use config::RawJobConfig;
pub use retry::AdaptiveRetryLoop;
pub use schedule::{ScheduleConfig, ScheduledTask, Scheduler, SchedulerEvent, SchedulerHandle};
pub use workflow::{DbRawTask, RawChainWorkflow};
