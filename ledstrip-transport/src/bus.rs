//! Serialized driver access
//!
//! `DriverBus` is the only handle the rest of the system uses to reach the
//! driver: every call is a job on the shared `CommandSerializer`.

use std::sync::Arc;

use tracing::warn;

use crate::client::{Budget, CommandResult, DriverClient, Timeouts};
use crate::protocol::{DriverCommand, DriverConfig, DriverStatus};
use crate::serializer::CommandSerializer;
use crate::BoxedTransport;

#[derive(Clone)]
pub struct DriverBus {
    client: Arc<DriverClient>,
    lane: CommandSerializer,
}

impl DriverBus {
    /// Must be called inside a Tokio runtime (spawns the lane worker).
    pub fn new(client: DriverClient, queue_depth: usize) -> Self {
        Self {
            client: Arc::new(client),
            lane: CommandSerializer::new(queue_depth),
        }
    }

    pub fn from_transport(
        transport: BoxedTransport,
        timeouts: Timeouts,
        queue_depth: usize,
    ) -> Self {
        Self::new(DriverClient::new(transport, timeouts), queue_depth)
    }

    pub fn client(&self) -> &DriverClient {
        &self.client
    }

    pub fn lane(&self) -> &CommandSerializer {
        &self.lane
    }

    /// Queue one command.
    pub async fn send(&self, cmd: DriverCommand, budget: Budget) -> CommandResult {
        let client = Arc::clone(&self.client);
        self.lane
            .enqueue(move || async move { client.send_command(&cmd, budget).await })
            .await
            .unwrap_or_else(CommandResult::from)
    }

    /// Queue several commands as one job so nothing interleaves between them.
    ///
    /// Every command is attempted; the first failure is reported.
    pub async fn send_frame(&self, cmds: Vec<DriverCommand>, budget: Budget) -> CommandResult {
        let client = Arc::clone(&self.client);
        self.lane
            .enqueue(move || async move {
                let mut outcome = CommandResult::ok();
                for cmd in &cmds {
                    let result = client.send_command(cmd, budget).await;
                    if outcome.success && !result.success {
                        outcome = result;
                    }
                }
                outcome
            })
            .await
            .unwrap_or_else(CommandResult::from)
    }

    pub async fn get_config(&self) -> Option<DriverConfig> {
        let client = Arc::clone(&self.client);
        match self
            .lane
            .enqueue(move || async move { client.get_config().await })
            .await
        {
            Ok(config) => config,
            Err(e) => {
                warn!("get_config not delivered: {}", e);
                None
            }
        }
    }

    pub async fn get_status(&self) -> Option<DriverStatus> {
        let client = Arc::clone(&self.client);
        match self
            .lane
            .enqueue(move || async move { client.get_status().await })
            .await
        {
            Ok(status) => status,
            Err(e) => {
                warn!("Status query not delivered: {}", e);
                None
            }
        }
    }
}
