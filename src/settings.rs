//! On-disk settings for `ledctl`
//!
//! Stored as TOML. Every field has a default, so a partial or missing file
//! is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ledstrip_transport::protocol::timing;
use ledstrip_transport::Timeouts;
use serde::{Deserialize, Serialize};

fn default_driver_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_command_timeout_ms() -> u64 {
    timing::COMMAND_TIMEOUT_MS
}

fn default_effect_timeout_ms() -> u64 {
    timing::EFFECT_TIMEOUT_MS
}

fn default_queue_depth() -> usize {
    timing::QUEUE_DEPTH
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the LED driver service
    #[serde(default = "default_driver_url")]
    pub driver_url: String,

    /// Timeout for direct commands (ms)
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Timeout for commands sent from an effect step (ms)
    #[serde(default = "default_effect_timeout_ms")]
    pub effect_timeout_ms: u64,

    /// Pending driver calls buffered by the command lane
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Stop a running effect before a direct pixel write
    #[serde(default = "default_true")]
    pub preempt_on_direct: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            driver_url: default_driver_url(),
            command_timeout_ms: default_command_timeout_ms(),
            effect_timeout_ms: default_effect_timeout_ms(),
            queue_depth: default_queue_depth(),
            preempt_on_direct: true,
        }
    }
}

impl Settings {
    /// `~/.config/ledctl/ledctl.toml` (or the platform equivalent)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ledctl")
            .join("ledctl.toml")
    }

    /// Load settings from a file, or return defaults if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            command: Duration::from_millis(self.command_timeout_ms),
            effect: Duration::from_millis(self.effect_timeout_ms),
        }
    }
}
