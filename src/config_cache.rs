//! Last known strip configuration.
//!
//! The LED count can only be learned from the driver, so anything that
//! sizes a pixel buffer calls [`ConfigCache::refresh`]. The cached value is
//! a snapshot and may be briefly stale.

use ledstrip_transport::{DriverBus, DriverConfig};
use parking_lot::RwLock;
use tracing::debug;

pub struct ConfigCache {
    bus: DriverBus,
    last: RwLock<Option<DriverConfig>>,
}

impl ConfigCache {
    pub fn new(bus: DriverBus) -> Self {
        Self {
            bus,
            last: RwLock::new(None),
        }
    }

    /// Query the driver and update the cache. `None` if unreachable.
    pub async fn refresh(&self) -> Option<DriverConfig> {
        let config = self.bus.get_config().await?;
        debug!(
            "Driver config: {} LEDs, brightness {:.2}",
            config.led_count, config.brightness
        );
        *self.last.write() = Some(config);
        Some(config)
    }

    /// Last fetched values, or the defaults if none were ever fetched.
    pub fn current(&self) -> DriverConfig {
        self.last.read().unwrap_or_default()
    }

    /// Whether the driver has ever answered `get_config`
    pub fn is_known(&self) -> bool {
        self.last.read().is_some()
    }

    /// Record a brightness the driver accepted
    pub fn note_brightness(&self, brightness: f32) {
        if let Some(config) = self.last.write().as_mut() {
            config.brightness = brightness;
        }
    }
}
