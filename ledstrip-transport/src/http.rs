//! HTTP transport to the driver process

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{DriverCommand, DriverReply, DriverStatus, STATUS_PATH};
use crate::DriverTransport;

/// Talks JSON over HTTP to a driver at `base_url`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn status_url(&self) -> String {
        format!("{}/{STATUS_PATH}", self.base_url)
    }
}

/// Re-tag reqwest timeouts with the budget that was actually applied.
fn map_err(e: reqwest::Error, timeout: Duration) -> TransportError {
    match TransportError::from(e) {
        TransportError::Timeout(_) => TransportError::Timeout(timeout.as_millis() as u64),
        other => other,
    }
}

/// Turn a non-2xx response into the best diagnostic available.
async fn status_error(response: reqwest::Response) -> TransportError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DriverReply>(&body)
        .ok()
        .and_then(|r| r.error.or(r.message))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    TransportError::Status {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl DriverTransport for HttpTransport {
    async fn post_command(
        &self,
        cmd: &DriverCommand,
        timeout: Duration,
    ) -> Result<DriverReply, TransportError> {
        debug!("POST {} command={}", self.base_url, cmd.name());
        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .timeout(timeout)
            .json(cmd)
            .send()
            .await
            .map_err(|e| map_err(e, timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .json::<DriverReply>()
            .await
            .map_err(|e| map_err(e, timeout))
    }

    async fn fetch_status(&self, timeout: Duration) -> Result<DriverStatus, TransportError> {
        let url = self.status_url();
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_err(e, timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .json::<DriverStatus>()
            .await
            .map_err(|e| map_err(e, timeout))
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
