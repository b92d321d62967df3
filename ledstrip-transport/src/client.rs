//! Driver client
//!
//! Issues single commands and maps every transport failure to a value:
//! `CommandResult { success: false, .. }` for commands, `None` for reads.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::protocol::{timing, DriverCommand, DriverConfig, DriverReply, DriverStatus};
use crate::BoxedTransport;

/// Outcome of one driver command. Never an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}

impl From<TransportError> for CommandResult {
    fn from(e: TransportError) -> Self {
        Self::failed(e.to_string())
    }
}

/// Which timeout budget a call runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// User-initiated command
    Direct,
    /// Command issued from an effect step (tighter, so a hung call can't stall a sequence)
    Effect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub command: Duration,
    pub effect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command: Duration::from_millis(timing::COMMAND_TIMEOUT_MS),
            effect: Duration::from_millis(timing::EFFECT_TIMEOUT_MS),
        }
    }
}

impl Timeouts {
    pub fn for_budget(&self, budget: Budget) -> Duration {
        match budget {
            Budget::Direct => self.command,
            Budget::Effect => self.effect,
        }
    }
}

/// Thin, failure-absorbing wrapper over a `DriverTransport`.
#[derive(Clone)]
pub struct DriverClient {
    transport: BoxedTransport,
    timeouts: Timeouts,
}

impl DriverClient {
    pub fn new(transport: BoxedTransport, timeouts: Timeouts) -> Self {
        Self {
            transport,
            timeouts,
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    async fn call(
        &self,
        cmd: &DriverCommand,
        budget: Budget,
    ) -> Result<DriverReply, TransportError> {
        let timeout = self.timeouts.for_budget(budget);
        let reply = self.transport.post_command(cmd, timeout).await?;
        if reply.success {
            Ok(reply)
        } else {
            Err(TransportError::Rejected(
                reply
                    .error
                    .or(reply.message)
                    .unwrap_or_else(|| format!("{} failed", cmd.name())),
            ))
        }
    }

    /// Send one command to the driver.
    pub async fn send_command(&self, cmd: &DriverCommand, budget: Budget) -> CommandResult {
        match self.call(cmd, budget).await {
            Ok(reply) => {
                if let Some(msg) = reply.message {
                    debug!("{}: {}", cmd.name(), msg);
                }
                CommandResult::ok()
            }
            Err(e) => {
                warn!("Driver command {} failed: {}", cmd.name(), e);
                e.into()
            }
        }
    }

    /// Query LED count and brightness; `None` if the driver is unreachable.
    pub async fn get_config(&self) -> Option<DriverConfig> {
        match self.call(&DriverCommand::GetConfig, Budget::Direct).await {
            Ok(DriverReply {
                led_count: Some(led_count),
                brightness,
                ..
            }) => Some(DriverConfig {
                led_count,
                brightness: brightness.unwrap_or(DriverConfig::default().brightness),
            }),
            Ok(_) => {
                warn!("get_config reply carried no led_count");
                None
            }
            Err(e) => {
                warn!("get_config failed: {}", e);
                None
            }
        }
    }

    /// Read the status endpoint; `None` if the driver is unreachable.
    pub async fn get_status(&self) -> Option<DriverStatus> {
        match self.transport.fetch_status(self.timeouts.command).await {
            Ok(status) if status.success => Some(status),
            Ok(status) => {
                warn!(
                    "Driver status reported failure: {}",
                    status.message.as_deref().unwrap_or("no message")
                );
                None
            }
            Err(e) => {
                warn!("Status query failed: {}", e);
                None
            }
        }
    }
}
