//! Extraction adapter that runs an external extractor program per attempt.
//!
//! The extractor owns RPC batching, pagination and persistence. This adapter
//! only passes the load parameters on its command line and maps the process
//! outcome back onto the error taxonomy:
//!
//! | Outcome | Result |
//! |---------|--------|
//! | exit 0 | `Ok(())` |
//! | exit 75, or stderr contains `MaxWaitTimeExceeded` | `ResourceWaitExceeded` |
//! | other non-zero exit | `Extraction` |
//! | spawn failure | `Extraction` |
//! | exceeds the command timeout | `Timeout` |

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use gtp_core::defaults::{
    EXTRACTOR_CMD, EXTRACTOR_EXIT_MAX_WAIT, EXTRACTOR_MAX_WAIT_MARKER, EXTRACTOR_TIMEOUT_SECS,
};
use gtp_core::{AdapterParams, Error, ExtractionOperation, LoadParameters, Result};

/// Extraction operation backed by an external extractor process.
#[derive(Debug, Clone)]
pub struct CommandExtractionAdapter {
    program: String,
    base_args: Vec<String>,
    params: AdapterParams,
    timeout: Duration,
    name: String,
}

impl CommandExtractionAdapter {
    /// Create an adapter invoking the default extractor program.
    pub fn new(params: AdapterParams) -> Self {
        let name = format!("{}:{}", EXTRACTOR_CMD, params.chain);
        Self {
            program: EXTRACTOR_CMD.to_string(),
            base_args: Vec::new(),
            params,
            timeout: Duration::from_secs(EXTRACTOR_TIMEOUT_SECS),
            name,
        }
    }

    /// Use a different extractor program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self.name = format!("{}:{}", self.program, self.params.chain);
        self
    }

    /// Arguments placed before the generated load-parameter flags.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn adapter_params(&self) -> &AdapterParams {
        &self.params
    }

    /// Full argument list for one invocation.
    pub fn args(&self, load: &LoadParameters) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend([
            "--chain".to_string(),
            self.params.chain.clone(),
            "--rpc-url".to_string(),
            self.params.rpc_url.clone(),
            "--block-start".to_string(),
            load.block_start.to_string(),
            "--batch-size".to_string(),
            load.batch_size.to_string(),
            "--threads".to_string(),
            load.threads().to_string(),
        ]);
        args
    }
}

/// Map an extractor exit status onto the error taxonomy.
pub fn classify_exit(code: Option<i32>, stderr: &str) -> Result<()> {
    let stderr = stderr.trim();
    match code {
        Some(0) => Ok(()),
        Some(EXTRACTOR_EXIT_MAX_WAIT) => Err(Error::ResourceWaitExceeded(stderr.to_string())),
        _ if stderr.contains(EXTRACTOR_MAX_WAIT_MARKER) => {
            Err(Error::ResourceWaitExceeded(stderr.to_string()))
        }
        Some(code) => Err(Error::Extraction(format!(
            "extractor failed (exit {code}): {stderr}"
        ))),
        None => Err(Error::Extraction(format!(
            "extractor terminated by signal: {stderr}"
        ))),
    }
}

#[async_trait]
impl ExtractionOperation for CommandExtractionAdapter {
    async fn extract_raw(&self, load: &LoadParameters) -> Result<()> {
        let start = Instant::now();
        let args = self.args(load);
        debug!(
            subsystem = "jobs",
            component = "command_adapter",
            program = %self.program,
            threads = load.threads(),
            "Spawning extractor"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "extractor timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Extraction(format!("failed to execute {}: {}", self.program, e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        classify_exit(output.status.code(), &stderr)?;

        info!(
            subsystem = "jobs",
            component = "command_adapter",
            chain = %self.params.chain,
            threads = load.threads(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extractor finished"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtp_core::BlockStart;

    fn adapter_params() -> AdapterParams {
        AdapterParams {
            chain: "starknet".to_string(),
            rpc_url: "https://starknet.rpc.example".to_string(),
        }
    }

    /// Adapter running `script` through `sh`, with the generated flags as `$@`.
    fn shell_adapter(script: &str) -> CommandExtractionAdapter {
        CommandExtractionAdapter::new(adapter_params())
            .with_program("sh")
            .with_base_args(["-c", script, "extractor"])
    }

    #[test]
    fn test_args() {
        let adapter = CommandExtractionAdapter::new(adapter_params());
        let load = LoadParameters::new(BlockStart::Auto, 250, 3).unwrap();
        assert_eq!(
            adapter.args(&load),
            vec![
                "--chain",
                "starknet",
                "--rpc-url",
                "https://starknet.rpc.example",
                "--block-start",
                "auto",
                "--batch-size",
                "250",
                "--threads",
                "3",
            ]
        );
    }

    #[test]
    fn test_name_tracks_program() {
        let adapter = CommandExtractionAdapter::new(adapter_params());
        assert_eq!(adapter.name(), "gtp-extract-raw:starknet");
        let adapter = adapter.with_program("/opt/bin/extract");
        assert_eq!(adapter.name(), "/opt/bin/extract:starknet");
    }

    #[test]
    fn test_classify_exit() {
        assert!(classify_exit(Some(0), "").is_ok());
        assert!(classify_exit(Some(0), "MaxWaitTimeExceeded ignored on success").is_ok());
        assert!(classify_exit(Some(75), "slow rpc")
            .unwrap_err()
            .is_resource_wait_exceeded());
        assert!(classify_exit(Some(1), "MaxWaitTimeExceeded: 8 threads")
            .unwrap_err()
            .is_resource_wait_exceeded());

        let err = classify_exit(Some(2), " bad block \n").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert_eq!(
            err.to_string(),
            "Extraction error: extractor failed (exit 2): bad block"
        );

        assert!(matches!(
            classify_exit(None, "killed"),
            Err(Error::Extraction(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_success() {
        let adapter = shell_adapter("exit 0");
        let load = LoadParameters::new(BlockStart::Auto, 10, 1).unwrap();
        assert!(adapter.extract_raw(&load).await.is_ok());
    }

    #[tokio::test]
    async fn test_extract_receives_current_threads() {
        let adapter = shell_adapter(
            r#"case "$*" in *"--threads 2"*) exit 0 ;; *) echo "MaxWaitTimeExceeded" >&2; exit 1 ;; esac"#,
        );

        let load = LoadParameters::new(BlockStart::Auto, 10, 3).unwrap();
        let err = adapter.extract_raw(&load).await.unwrap_err();
        assert!(err.is_resource_wait_exceeded());

        let load = LoadParameters::new(BlockStart::Auto, 10, 2).unwrap();
        assert!(adapter.extract_raw(&load).await.is_ok());
    }

    #[tokio::test]
    async fn test_extract_tempfail_exit_code() {
        let adapter = shell_adapter("echo 'waited 600s' >&2; exit 75");
        let load = LoadParameters::new(BlockStart::Auto, 10, 4).unwrap();
        let err = adapter.extract_raw(&load).await.unwrap_err();
        assert_eq!(err.to_string(), "Max wait time exceeded: waited 600s");
    }

    #[tokio::test]
    async fn test_extract_missing_program() {
        let adapter = CommandExtractionAdapter::new(adapter_params())
            .with_program("/nonexistent/gtp-extract-raw");
        let load = LoadParameters::new(BlockStart::Auto, 10, 1).unwrap();
        let err = adapter.extract_raw(&load).await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn test_extract_timeout() {
        let adapter = shell_adapter("sleep 5").with_timeout(Duration::from_millis(100));
        let load = LoadParameters::new(BlockStart::Auto, 10, 1).unwrap();
        let err = adapter.extract_raw(&load).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
