//! Periodic scheduler for extraction tasks.
//!
//! Runs a [`ScheduledTask`] on a fixed interval. Each run gets a hard
//! execution timeout per attempt, a bounded number of retries with a fixed
//! delay, and failure alerts once the last attempt fails. Runs never overlap:
//! a tick that fires while a run is in progress is skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use gtp_core::defaults::{
    EVENT_BUS_CAPACITY, SCHEDULE_DAG_ID, SCHEDULE_DESCRIPTION, SCHEDULE_EXECUTION_TIMEOUT_SECS,
    SCHEDULE_INTERVAL_SECS, SCHEDULE_RETRIES, SCHEDULE_RETRY_DELAY_SECS, SCHEDULE_TAGS,
};
use gtp_core::{new_run_id, Error, FailureAlert, Result, RunFailure};

/// Schedule registration for a task.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Stable schedule identifier.
    pub dag_id: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Ticks before this date are skipped.
    pub start_date: NaiveDate,
    /// Interval between runs.
    pub interval: Duration,
    /// Hard budget for a single attempt.
    pub execution_timeout: Duration,
    /// Additional attempts after the first failed one.
    pub retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
    /// Whether the periodic loop runs at all.
    pub enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            dag_id: SCHEDULE_DAG_ID.to_string(),
            description: SCHEDULE_DESCRIPTION.to_string(),
            tags: SCHEDULE_TAGS.iter().map(|t| t.to_string()).collect(),
            start_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap_or_default(),
            interval: Duration::from_secs(SCHEDULE_INTERVAL_SECS),
            execution_timeout: Duration::from_secs(SCHEDULE_EXECUTION_TIMEOUT_SECS),
            retries: SCHEDULE_RETRIES,
            retry_delay: Duration::from_secs(SCHEDULE_RETRY_DELAY_SECS),
            enabled: true,
        }
    }
}

impl ScheduleConfig {
    pub fn with_dag_id(mut self, dag_id: impl Into<String>) -> Self {
        self.dag_id = dag_id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Total attempts a run may make.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// A unit of work run by the scheduler.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Task name used in logs and alerts.
    fn name(&self) -> &str;

    /// Execute the task once.
    async fn run(&self) -> Result<()>;
}

/// Event emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// Periodic loop started.
    SchedulerStarted,
    /// A run began.
    RunStarted { run_id: Uuid },
    /// An attempt within a run failed.
    AttemptFailed {
        run_id: Uuid,
        attempt: u32,
        error: String,
    },
    /// A run finished successfully.
    RunSucceeded { run_id: Uuid, attempts: u32 },
    /// A run failed its final attempt.
    RunFailed {
        run_id: Uuid,
        attempts: u32,
        error: String,
    },
    /// Periodic loop stopped.
    SchedulerStopped,
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<SchedulerEvent>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to stop. An in-flight run is abandoned.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for scheduler events.
    pub fn events(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_rx.resubscribe()
    }

    /// Wait for the scheduler loop to exit.
    pub async fn wait(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| Error::Internal(format!("Scheduler task failed: {e}")))
    }
}

/// Runs a task on a schedule with retries and failure alerts.
pub struct Scheduler {
    config: ScheduleConfig,
    task: Arc<dyn ScheduledTask>,
    alerts: Vec<Arc<dyn FailureAlert>>,
    event_tx: broadcast::Sender<SchedulerEvent>,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig, task: Arc<dyn ScheduledTask>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            config,
            task,
            alerts: Vec::new(),
            event_tx,
        }
    }

    /// Register a hook notified when a run fails terminally.
    pub fn with_alert(mut self, alert: Arc<dyn FailureAlert>) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Get a receiver for scheduler events.
    pub fn events(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_tx.subscribe()
    }

    /// Execute one scheduled run, including retries and alerting.
    ///
    /// Returns the error of the final attempt if every attempt failed.
    #[instrument(skip(self), fields(dag_id = %self.config.dag_id, task = self.task.name()))]
    pub async fn run_once(&self) -> Result<()> {
        let run_id = new_run_id();
        let max_attempts = self.config.max_attempts();
        let _ = self.event_tx.send(SchedulerEvent::RunStarted { run_id });
        info!(%run_id, max_attempts, "Run started");

        let mut attempt = 0;
        loop {
            attempt += 1;
            let start = Instant::now();

            let result = match tokio::time::timeout(self.config.execution_timeout, self.task.run())
                .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "{} exceeded execution timeout of {}s",
                    self.task.name(),
                    self.config.execution_timeout.as_secs()
                ))),
            };

            match result {
                Ok(()) => {
                    info!(
                        %run_id,
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Run succeeded"
                    );
                    let _ = self.event_tx.send(SchedulerEvent::RunSucceeded {
                        run_id,
                        attempts: attempt,
                    });
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        %run_id,
                        attempt,
                        max_attempts,
                        error = %e,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Run attempt failed"
                    );
                    let _ = self.event_tx.send(SchedulerEvent::AttemptFailed {
                        run_id,
                        attempt,
                        error: e.to_string(),
                    });

                    if attempt >= max_attempts {
                        error!(%run_id, attempts = attempt, error = %e, "Run failed");
                        let failure = RunFailure {
                            dag_id: self.config.dag_id.clone(),
                            task: self.task.name().to_string(),
                            run_id,
                            attempts: attempt,
                            error: e.to_string(),
                            failed_at: Utc::now(),
                        };
                        self.dispatch_alerts(&failure).await;
                        let _ = self.event_tx.send(SchedulerEvent::RunFailed {
                            run_id,
                            attempts: attempt,
                            error: failure.error,
                        });
                        return Err(e);
                    }

                    sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    /// Notify every alert hook. Alert failures are logged, never propagated.
    async fn dispatch_alerts(&self, failure: &RunFailure) {
        for alert in &self.alerts {
            match alert.alert(failure).await {
                Ok(()) => debug!(alert = alert.name(), run_id = %failure.run_id, "Alert sent"),
                Err(e) => error!(
                    alert = alert.name(),
                    run_id = %failure.run_id,
                    error = %e,
                    "Failed to send failure alert"
                ),
            }
        }
    }

    /// Start the periodic loop and return a handle for control.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let join = tokio::spawn(async move {
            self.run_loop(&mut shutdown_rx).await;
        });

        SchedulerHandle {
            shutdown_tx,
            event_rx,
            join,
        }
    }

    async fn run_loop(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(dag_id = %self.config.dag_id, "Scheduler is disabled, not starting");
            return;
        }

        info!(
            dag_id = %self.config.dag_id,
            description = %self.config.description,
            tags = ?self.config.tags,
            interval_secs = self.config.interval.as_secs(),
            execution_timeout_secs = self.config.execution_timeout.as_secs(),
            retries = self.config.retries,
            "Scheduler started"
        );
        let _ = self.event_tx.send(SchedulerEvent::SchedulerStarted);

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {}
            }

            if Utc::now().date_naive() < self.config.start_date {
                debug!(start_date = %self.config.start_date, "Before start date, skipping tick");
                continue;
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    warn!("Scheduler received shutdown signal during run, abandoning run");
                    break;
                }
                // Errors are logged and alerted inside run_once.
                _ = self.run_once() => {}
            }
        }

        let _ = self.event_tx.send(SchedulerEvent::SchedulerStopped);
        info!("Scheduler stopped");
    }
}
