//! In-memory driver and pacing doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use ledctl::effect::Pacer;
use ledctl::{ConfigCache, EffectEngine, LedController};
use ledstrip_transport::{
    DriverBus, DriverCommand, DriverReply, DriverStatus, DriverTransport, Rgb, Timeouts,
    TransportError,
};

#[derive(Default)]
struct Strip {
    /// Written by set_pixel(s), not yet visible
    buffer: Vec<Rgb>,
    /// What the LEDs show after the last `show`
    shown: Vec<Rgb>,
    brightness: f32,
}

/// Fake driver that applies commands to an in-memory strip and records them.
pub struct RecordingDriver {
    led_count: AtomicUsize,
    strip: Mutex<Strip>,
    /// Each delivered command with the timeout it was sent under
    log: Mutex<Vec<(DriverCommand, Duration)>>,
    /// Every call fails as if the driver were down
    unreachable: AtomicBool,
    /// Pixel and brightness writes are answered with `success: false`
    reject_writes: AtomicBool,
    /// Every command and status read is answered with `success: false`
    reject_all: AtomicBool,
    delay_ms: AtomicU64,
}

impl RecordingDriver {
    pub fn new(led_count: usize) -> Arc<Self> {
        Arc::new(Self {
            led_count: AtomicUsize::new(led_count),
            strip: Mutex::new(Strip {
                buffer: vec![Rgb::BLACK; led_count],
                shown: vec![Rgb::BLACK; led_count],
                brightness: 0.5,
            }),
            log: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            reject_all: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        })
    }

    pub fn set_unreachable(&self, down: bool) {
        self.unreachable.store(down, Ordering::SeqCst);
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Simulated latency per command
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_brightness(&self, level: f32) {
        self.strip.lock().brightness = level;
    }

    pub fn shown(&self) -> Vec<Rgb> {
        self.strip.lock().shown.clone()
    }

    pub fn brightness(&self) -> f32 {
        self.strip.lock().brightness
    }

    /// Every recorded command except `get_config`
    pub fn writes(&self) -> Vec<DriverCommand> {
        self.log
            .lock()
            .iter()
            .map(|(c, _)| c)
            .filter(|c| !matches!(c, DriverCommand::GetConfig))
            .cloned()
            .collect()
    }

    /// Timeouts of every recorded command `matches` accepts, in order
    pub fn timeouts_of(&self, matches: impl Fn(&DriverCommand) -> bool) -> Vec<Duration> {
        self.log
            .lock()
            .iter()
            .filter(|(c, _)| matches(c))
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    pub fn brightness_writes(&self) -> Vec<f32> {
        self.writes()
            .into_iter()
            .filter_map(|c| match c {
                DriverCommand::SetBrightness { brightness } => Some(brightness),
                _ => None,
            })
            .collect()
    }

    fn apply(&self, cmd: &DriverCommand) -> DriverReply {
        if self.reject_all.load(Ordering::SeqCst) {
            return DriverReply {
                success: false,
                error: Some("LED hardware error".to_string()),
                ..DriverReply::default()
            };
        }
        let led_count = self.led_count.load(Ordering::SeqCst);
        let mut strip = self.strip.lock();
        match cmd {
            DriverCommand::GetConfig => {
                return DriverReply {
                    success: true,
                    led_count: Some(led_count),
                    brightness: Some(strip.brightness),
                    pin: Some("D18".to_string()),
                    ..DriverReply::default()
                };
            }
            DriverCommand::Show => {
                strip.shown = strip.buffer.clone();
            }
            _ if self.reject_writes.load(Ordering::SeqCst) => {
                return DriverReply {
                    success: false,
                    error: Some(format!("{} rejected", cmd.name())),
                    ..DriverReply::default()
                };
            }
            DriverCommand::SetPixel { index, color } => {
                if let Some(px) = strip.buffer.get_mut(*index) {
                    *px = *color;
                }
            }
            DriverCommand::SetPixels { pixels } => {
                for p in pixels {
                    if let Some(px) = strip.buffer.get_mut(p.index) {
                        *px = p.color;
                    }
                }
            }
            DriverCommand::SetBrightness { brightness } => {
                strip.brightness = *brightness;
            }
        }
        DriverReply {
            success: true,
            message: Some(format!("Queued {}", cmd.name())),
            ..DriverReply::default()
        }
    }
}

#[async_trait]
impl DriverTransport for RecordingDriver {
    async fn post_command(
        &self,
        cmd: &DriverCommand,
        timeout: Duration,
    ) -> Result<DriverReply, TransportError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout(timeout.as_millis() as u64));
        }
        self.log.lock().push((cmd.clone(), timeout));
        Ok(self.apply(cmd))
    }

    async fn fetch_status(&self, timeout: Duration) -> Result<DriverStatus, TransportError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout(timeout.as_millis() as u64));
        }
        Ok(DriverStatus {
            success: !self.reject_all.load(Ordering::SeqCst),
            led_count: self.led_count.load(Ordering::SeqCst),
            brightness: self.brightness(),
            message: Some("LED Driver is running".to_string()),
            pin: Some("D18".to_string()),
            queue_size: Some(0),
        })
    }

    fn endpoint(&self) -> &str {
        "memory://driver"
    }
}

/// Pacer that never sleeps, only yields, and remembers requested delays.
#[derive(Default)]
pub struct InstantPacer {
    delays: Mutex<Vec<Duration>>,
}

impl InstantPacer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Pacer for InstantPacer {
    async fn wait(&self, delay: Duration) {
        self.delays.lock().push(delay);
        tokio::task::yield_now().await;
    }
}

pub fn controller(driver: &Arc<RecordingDriver>, pacer: Arc<dyn Pacer>) -> LedController {
    let bus = DriverBus::from_transport(driver.clone(), Timeouts::default(), 64);
    LedController::new(bus, pacer)
}

/// Controller whose sparkle positions repeat for a given seed.
pub fn seeded_controller(
    driver: &Arc<RecordingDriver>,
    pacer: Arc<dyn Pacer>,
    seed: u64,
) -> LedController {
    let bus = DriverBus::from_transport(driver.clone(), Timeouts::default(), 64);
    let cache = Arc::new(ConfigCache::new(bus.clone()));
    let engine = EffectEngine::new(bus.clone(), Arc::clone(&cache), pacer).with_seed(seed);
    LedController::from_parts(bus, cache, engine)
}

/// Wait for the engine to go idle, failing the test after `limit`.
pub async fn idle_within(controller: &LedController, limit: Duration) {
    tokio::time::timeout(limit, controller.engine().wait_idle())
        .await
        .expect("effect did not finish in time");
}
