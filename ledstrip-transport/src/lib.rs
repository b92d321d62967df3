//! Transport layer for remote LED strip drivers
//!
//! The driver is a separate process that owns the strip hardware and
//! accepts a small JSON command set over HTTP. This crate provides:
//!
//! - `DriverTransport`: the raw request/response seam (HTTP, or a test double)
//! - `DriverClient`: single commands with failures mapped to values
//! - `CommandSerializer`: the single lane every driver call runs on
//! - `DriverBus`: client + lane, the handle higher layers hold
//!
//! ```text
//! [LedController / EffectEngine]
//!              |
//!          DriverBus           ← one job at a time, in order
//!              |
//!         DriverClient         ← timeouts, failure → CommandResult
//!              |
//!      [HttpTransport]         ← implements DriverTransport
//! ```

pub mod bus;
pub mod client;
pub mod color;
pub mod error;
pub mod http;
pub mod protocol;
pub mod serializer;

pub use bus::DriverBus;
pub use client::{Budget, CommandResult, DriverClient, Timeouts};
pub use color::{hex_to_rgb, rgb_to_hex, Rgb};
pub use error::TransportError;
pub use http::HttpTransport;
pub use protocol::{
    clamp_brightness, DriverCommand, DriverConfig, DriverReply, DriverStatus, PixelCommand,
};
pub use serializer::CommandSerializer;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Raw access to a driver process
///
/// Implementations perform exactly one request per call and report
/// transport-level failures as `Err`. They do not interpret `success`.
#[async_trait]
pub trait DriverTransport: Send + Sync {
    /// POST a command object to the command endpoint
    async fn post_command(
        &self,
        cmd: &DriverCommand,
        timeout: Duration,
    ) -> Result<DriverReply, TransportError>;

    /// Plain read of the status endpoint
    async fn fetch_status(&self, timeout: Duration) -> Result<DriverStatus, TransportError>;

    /// Human-readable location of the driver (for logs)
    fn endpoint(&self) -> &str;
}

/// Type alias for a shared transport
pub type BoxedTransport = Arc<dyn DriverTransport>;
