//! Upstream operation surface.
//!
//! `LedController` is what a route layer or the CLI calls. Every method
//! returns an [`OpResult`]; nothing here panics or returns `Err`.

use std::sync::Arc;

use ledstrip_transport::{
    clamp_brightness, Budget, DriverBus, DriverCommand, DriverConfig, DriverStatus,
    PixelCommand, Rgb,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config_cache::ConfigCache;
use crate::effect::{Effect, EffectEngine, EffectKind, EngineState, EngineStats, Pacer};
use crate::error::ControlError;

/// Outcome of an upstream operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpResult<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> OpResult<T> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn ok_with(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T> From<ControlError> for OpResult<T> {
    fn from(e: ControlError) -> Self {
        Self::failed(e.to_string())
    }
}

pub struct LedController {
    bus: DriverBus,
    cache: Arc<ConfigCache>,
    engine: EffectEngine,
    preempt_on_direct: bool,
}

impl LedController {
    pub fn new(bus: DriverBus, pacer: Arc<dyn Pacer>) -> Self {
        let cache = Arc::new(ConfigCache::new(bus.clone()));
        let engine = EffectEngine::new(bus.clone(), Arc::clone(&cache), pacer);
        Self::from_parts(bus, cache, engine)
    }

    pub fn from_parts(bus: DriverBus, cache: Arc<ConfigCache>, engine: EffectEngine) -> Self {
        Self {
            bus,
            cache,
            engine,
            preempt_on_direct: true,
        }
    }

    /// Whether direct pixel writes stop a running effect first
    pub fn preempt_on_direct(mut self, enabled: bool) -> Self {
        self.preempt_on_direct = enabled;
        self
    }

    pub fn engine(&self) -> &EffectEngine {
        &self.engine
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    pub fn bus(&self) -> &DriverBus {
        &self.bus
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    // === Helpers ===

    async fn led_count(&self) -> Result<usize, ControlError> {
        match self.cache.refresh().await {
            None => Err(ControlError::DriverUnavailable),
            Some(DriverConfig { led_count: 0, .. }) => Err(ControlError::NoLeds),
            Some(config) => Ok(config.led_count),
        }
    }

    async fn prepare_direct(&self) -> Result<usize, ControlError> {
        if self.preempt_on_direct {
            if let Some(kind) = self.engine.preempt().await {
                info!("{kind} effect stopped by direct command");
            }
        }
        self.led_count().await
    }

    /// Write pixels and latch them with one `show`.
    async fn write(&self, pixels: Vec<PixelCommand>) -> Result<(), ControlError> {
        debug!("Writing {} pixels", pixels.len());
        let result = self
            .bus
            .send_frame(
                vec![DriverCommand::SetPixels { pixels }, DriverCommand::Show],
                Budget::Direct,
            )
            .await;
        if result.success {
            Ok(())
        } else {
            Err(ControlError::Command(
                result
                    .error_message
                    .unwrap_or_else(|| "driver command failed".to_string()),
            ))
        }
    }

    fn finish(outcome: Result<String, ControlError>) -> OpResult {
        match outcome {
            Ok(message) => OpResult::ok(message),
            Err(e) => e.into(),
        }
    }

    async fn try_set_pixel(&self, index: usize, color: Rgb) -> Result<String, ControlError> {
        let led_count = self.prepare_direct().await?;
        if index >= led_count {
            return Err(ControlError::IndexOutOfRange { index, led_count });
        }
        let result = self
            .bus
            .send_frame(
                vec![DriverCommand::SetPixel { index, color }, DriverCommand::Show],
                Budget::Direct,
            )
            .await;
        if !result.success {
            return Err(ControlError::Command(result.error_message.unwrap_or_default()));
        }
        Ok(format!("Set pixel {index} to {color}"))
    }

    async fn try_set_pixels(&self, pixels: Vec<PixelCommand>) -> Result<String, ControlError> {
        let led_count = self.prepare_direct().await?;
        let requested = pixels.len();
        let valid: Vec<_> = pixels
            .into_iter()
            .filter(|p| p.index < led_count)
            .collect();
        let applied = valid.len();
        self.write(valid).await?;
        Ok(if applied == requested {
            format!("Set {applied} pixels")
        } else {
            format!(
                "Set {applied} pixels ({} out of range dropped)",
                requested - applied
            )
        })
    }

    async fn try_set_range(
        &self,
        start: usize,
        end: usize,
        color: Rgb,
    ) -> Result<String, ControlError> {
        let led_count = self.prepare_direct().await?;
        if start > end || start >= led_count {
            return Err(ControlError::EmptyRange {
                start,
                end,
                led_count,
            });
        }
        let last = end.min(led_count - 1);
        let pixels = (start..=last).map(|i| PixelCommand::new(i, color)).collect();
        self.write(pixels).await?;
        Ok(format!("Set pixels {start}-{last} to {color}"))
    }

    async fn try_apply_pattern(&self, pattern: Vec<PixelCommand>) -> Result<String, ControlError> {
        let led_count = self.prepare_direct().await?;
        let mut frame = vec![Rgb::BLACK; led_count];
        let mut applied = 0;
        for p in pattern.iter().filter(|p| p.index < led_count) {
            frame[p.index] = p.color;
            applied += 1;
        }
        let pixels = frame
            .into_iter()
            .enumerate()
            .map(|(i, c)| PixelCommand::new(i, c))
            .collect();
        self.write(pixels).await?;
        Ok(format!(
            "Applied pattern ({applied} of {} entries)",
            pattern.len()
        ))
    }

    async fn try_fill(&self, color: Rgb) -> Result<String, ControlError> {
        let led_count = self.prepare_direct().await?;
        self.write(
            (0..led_count)
                .map(|i| PixelCommand::new(i, color))
                .collect(),
        )
        .await?;
        Ok(if color == Rgb::BLACK {
            format!("Cleared {led_count} LEDs")
        } else {
            format!("Filled {led_count} LEDs with {color}")
        })
    }

    // === Direct pixel operations ===

    pub async fn set_pixel(&self, index: usize, color: Rgb) -> OpResult {
        Self::finish(self.try_set_pixel(index, color).await)
    }

    /// Update the listed pixels; entries outside the strip are dropped.
    pub async fn set_pixels(&self, pixels: Vec<PixelCommand>) -> OpResult {
        Self::finish(self.try_set_pixels(pixels).await)
    }

    /// Color `start..=end`, clipped to the strip.
    pub async fn set_range(&self, start: usize, end: usize, color: Rgb) -> OpResult {
        Self::finish(self.try_set_range(start, end, color).await)
    }

    /// Replace the whole strip: listed pixels get their color, the rest go
    /// dark. Entries outside the strip are dropped.
    pub async fn apply_pattern(&self, pattern: Vec<PixelCommand>) -> OpResult {
        Self::finish(self.try_apply_pattern(pattern).await)
    }

    pub async fn fill(&self, color: Rgb) -> OpResult {
        Self::finish(self.try_fill(color).await)
    }

    pub async fn clear(&self) -> OpResult {
        Self::finish(self.try_fill(Rgb::BLACK).await)
    }

    /// Set global brightness, clamped to [0, 1]. Does not stop effects.
    pub async fn set_brightness(&self, level: f32) -> OpResult {
        let brightness = clamp_brightness(level);
        let result = self
            .bus
            .send_frame(
                vec![
                    DriverCommand::SetBrightness { brightness },
                    DriverCommand::Show,
                ],
                Budget::Direct,
            )
            .await;
        if result.success {
            self.cache.note_brightness(brightness);
            OpResult::ok(format!("Brightness set to {brightness:.2}"))
        } else {
            OpResult::failed(
                result
                    .error_message
                    .unwrap_or_else(|| "set_brightness failed".to_string()),
            )
        }
    }

    // === Queries ===

    pub async fn get_config(&self) -> OpResult<DriverConfig> {
        match self.cache.refresh().await {
            Some(config) => OpResult::ok_with(config),
            None => ControlError::DriverUnavailable.into(),
        }
    }

    pub async fn get_status(&self) -> OpResult<DriverStatus> {
        match self.bus.get_status().await {
            Some(status) => OpResult::ok_with(status),
            None => ControlError::DriverUnavailable.into(),
        }
    }

    // === Effects ===

    pub async fn start_effect(&self, effect: Effect) -> OpResult {
        match self.engine.start(effect).await {
            Ok(kind) => OpResult::ok(format!("{kind} effect started")),
            Err(e) => e.into(),
        }
    }

    pub async fn rainbow(&self, delay_ms: u64) -> OpResult {
        self.start_effect(Effect::Rainbow { delay_ms }).await
    }

    pub async fn wave(&self, color: Rgb, delay_ms: u64) -> OpResult {
        self.start_effect(Effect::Wave { color, delay_ms }).await
    }

    pub async fn breathe(&self, color: Rgb, duration_ms: u64) -> OpResult {
        self.start_effect(Effect::Breathe { color, duration_ms }).await
    }

    pub async fn sparkle(&self, color: Rgb, count: usize, duration_ms: u64) -> OpResult {
        self.start_effect(Effect::Sparkle {
            color,
            count,
            duration_ms,
        })
        .await
    }

    pub async fn chase(&self, color: Rgb, length: usize, delay_ms: u64) -> OpResult {
        self.start_effect(Effect::Chase {
            color,
            length,
            delay_ms,
        })
        .await
    }

    pub async fn fade_transition(&self, from: Rgb, to: Rgb, duration_ms: u64) -> OpResult {
        self.start_effect(Effect::FadeTransition {
            from,
            to,
            duration_ms,
        })
        .await
    }

    pub async fn infinite_chase(&self, color: Rgb, length: usize, delay_ms: u64) -> OpResult {
        self.start_effect(Effect::InfiniteChase {
            color,
            length,
            delay_ms,
        })
        .await
    }

    /// Stop any effect and turn the strip off.
    pub async fn stop_animation(&self) -> OpResult<EngineState> {
        match self.engine.stop_all().await {
            Ok(Some(kind)) => OpResult {
                success: true,
                message: Some(format!("{kind} effect stopped")),
                data: Some(self.engine.state()),
            },
            Ok(None) => OpResult {
                success: true,
                message: Some("No effect running; LEDs off".to_string()),
                data: Some(self.engine.state()),
            },
            Err(e) => e.into(),
        }
    }

    /// Kind of the running effect, if any
    pub fn active_effect(&self) -> Option<EffectKind> {
        match self.engine.state() {
            EngineState::Running(kind) => Some(kind),
            EngineState::Idle => None,
        }
    }
}
