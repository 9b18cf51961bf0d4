//! Failure alert delivery via signed webhooks.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::info;

use gtp_core::defaults::ALERT_TIMEOUT_SECS;
use gtp_core::{Error, FailureAlert, Result, RunFailure};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the event type.
pub const EVENT_HEADER: &str = "X-Gtp-Event";

/// Header carrying the HMAC-SHA256 body signature.
pub const SIGNATURE_HEADER: &str = "X-Gtp-Signature";

/// Posts run failures as JSON to a webhook URL.
pub struct WebhookAlert {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookAlert {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ALERT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            secret: None,
        })
    }

    /// Sign request bodies with the given shared secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Hex-encoded HMAC-SHA256 of `body` under `secret`.
pub fn sign_payload(secret: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid webhook secret: {e}")))?;
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl FailureAlert for WebhookAlert {
    async fn alert(&self, failure: &RunFailure) -> Result<()> {
        let body = serde_json::to_string(failure)?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header(EVENT_HEADER, "run.failed");

        if let Some(secret) = &self.secret {
            let signature = sign_payload(secret, &body)?;
            request = request.header(SIGNATURE_HEADER, format!("sha256={}", signature));
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "alert webhook returned {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        info!(
            subsystem = "alert",
            component = "webhook",
            dag_id = %failure.dag_id,
            run_id = %failure.run_id,
            status = status.as_u16(),
            "Failure alert delivered"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
