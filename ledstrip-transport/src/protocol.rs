//! Driver wire protocol
//!
//! The driver exposes one command endpoint (`POST /`) taking a JSON object
//! tagged by `command`, and a plain `GET /status` read.
//!
//! ```text
//! {"command":"set_pixels","pixels":[{"index":0,"color":"#ff0000"}]}
//! {"success":true,"message":"Queued set 1 pixels"}
//! {"success":false,"error":"Unknown command: blink"}
//! ```

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Request timing defaults
pub mod timing {
    /// Budget for direct (user-initiated) commands
    pub const COMMAND_TIMEOUT_MS: u64 = 5000;
    /// Budget for commands issued from an effect step
    pub const EFFECT_TIMEOUT_MS: u64 = 1000;
    /// Pending jobs the command lane buffers before `enqueue` waits
    pub const QUEUE_DEPTH: usize = 64;
}

/// Path of the status endpoint relative to the driver base URL
pub const STATUS_PATH: &str = "status";

/// Clamp a brightness level to [0, 1]; NaN becomes 0.
pub fn clamp_brightness(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// One pixel assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelCommand {
    pub index: usize,
    pub color: Rgb,
}

impl PixelCommand {
    pub fn new(index: usize, color: Rgb) -> Self {
        Self { index, color }
    }
}

/// Commands accepted by the driver's command endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DriverCommand {
    GetConfig,
    SetPixel { index: usize, color: Rgb },
    /// Writes the pixel buffer without refreshing the strip
    SetPixels { pixels: Vec<PixelCommand> },
    /// Latches the pixel buffer to the strip
    Show,
    SetBrightness { brightness: f32 },
}

impl DriverCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetConfig => "get_config",
            Self::SetPixel { .. } => "set_pixel",
            Self::SetPixels { .. } => "set_pixels",
            Self::Show => "show",
            Self::SetBrightness { .. } => "set_brightness",
        }
    }

    /// `set_brightness` with the level clamped to [0, 1]
    pub fn brightness(level: f32) -> Self {
        Self::SetBrightness {
            brightness: clamp_brightness(level),
        }
    }

    /// `set_pixels` filling `led_count` pixels with one color
    pub fn fill(led_count: usize, color: Rgb) -> Self {
        Self::SetPixels {
            pixels: (0..led_count).map(|i| PixelCommand::new(i, color)).collect(),
        }
    }
}

/// Response body of the command endpoint.
///
/// Only `success` is guaranteed; the rest depends on the command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

/// Strip geometry and brightness as last reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub led_count: usize,
    pub brightness: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            led_count: 0,
            brightness: 0.5,
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStatus {
    pub success: bool,
    #[serde(default)]
    pub led_count: usize,
    #[serde(default)]
    pub brightness: f32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    /// Commands waiting in the driver's own hardware queue
    #[serde(default)]
    pub queue_size: Option<usize>,
}
