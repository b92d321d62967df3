//! Effect session state machine.
//!
//! States are `Idle` and `Running(kind)`. At most one session exists; it
//! is owned by the engine and only reachable through `start`, `preempt`
//! and `stop_all`.
//!
//! - `start` cancels the current session, waits for its task to exit, then
//!   spawns the new one. It never returns while the old effect can still
//!   emit frames.
//! - A session that runs to completion clears itself back to `Idle`.
//! - Cancellation is checked once per step. A step's in-flight frame is
//!   allowed to finish; only the inter-step wait is cut short.
//! - Failed frames are counted and otherwise ignored.
//! - A transition whose caller is dropped mid-wait still leaves the engine
//!   `Idle`; the next transition waits for the abandoned task.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use ledstrip_transport::{Budget, DriverBus, Rgb};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::pacer::{CancelToken, Pacer};
use super::sequence::{Frame, Sequence};
use super::{Effect, EffectKind};
use crate::config_cache::ConfigCache;
use crate::error::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "effect", rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running(EffectKind),
}

/// Counters since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub frames_sent: u64,
    /// Effect frames the driver rejected or never received
    pub failed_frames: u64,
}

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    frames_sent: AtomicU64,
    failed_frames: AtomicU64,
}

/// The engine's record of the running effect.
struct EffectSession {
    id: u64,
    kind: EffectKind,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<EffectSession>>>;

pub struct EffectEngine {
    bus: DriverBus,
    cache: Arc<ConfigCache>,
    pacer: Arc<dyn Pacer>,
    /// Serializes start/stop so transitions never overlap
    transition: tokio::sync::Mutex<()>,
    slot: Slot,
    /// Task of a session whose teardown was abandoned mid-wait
    draining: Mutex<Option<JoinHandle<()>>>,
    state: Arc<watch::Sender<EngineState>>,
    counters: Arc<Counters>,
    next_id: AtomicU64,
    seed: Option<u64>,
}

impl EffectEngine {
    pub fn new(bus: DriverBus, cache: Arc<ConfigCache>, pacer: Arc<dyn Pacer>) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            bus,
            cache,
            pacer,
            transition: tokio::sync::Mutex::new(()),
            slot: Arc::new(Mutex::new(None)),
            draining: Mutex::new(None),
            state: Arc::new(state),
            counters: Arc::new(Counters::default()),
            next_id: AtomicU64::new(1),
            seed: None,
        }
    }

    /// Use a fixed RNG seed for sparkle positions
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Resolve once no effect is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // Sender lives as long as self, so this only ends on Idle
        let _ = rx.wait_for(|s| *s == EngineState::Idle).await;
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.counters;
        EngineStats {
            started: c.started.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            frames_sent: c.frames_sent.load(Ordering::Relaxed),
            failed_frames: c.failed_frames.load(Ordering::Relaxed),
        }
    }

    /// Replace whatever is running with `effect`.
    ///
    /// Fails without leaving a session behind if the driver can't report a
    /// non-zero LED count. Oversized parameters are refused before the
    /// running effect is touched.
    pub async fn start(&self, effect: Effect) -> Result<EffectKind, ControlError> {
        let kind = effect.kind();
        effect.check_span()?;
        let _transition = self.transition.lock().await;

        if let Some(previous) = self.cancel_active().await {
            info!("{previous} effect superseded by {kind}");
        }

        let config = self
            .cache
            .refresh()
            .await
            .ok_or(ControlError::DriverUnavailable)?;
        if config.led_count == 0 {
            return Err(ControlError::NoLeds);
        }

        let sequence = match self.seed {
            Some(seed) => Sequence::seeded(&effect, config, seed),
            None => Sequence::new(&effect, config),
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancelToken::new();
        let playback = Playback {
            id,
            bus: self.bus.clone(),
            pacer: Arc::clone(&self.pacer),
            cancel: cancel.clone(),
            slot: Arc::clone(&self.slot),
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
        };

        // Hold the slot while spawning so the task can't release before it's recorded
        let mut slot = self.slot.lock();
        let task = tokio::spawn(run_session(sequence, playback));
        *slot = Some(EffectSession {
            id,
            kind,
            cancel,
            task,
        });
        self.state.send_replace(EngineState::Running(kind));
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        debug!("Session {id} running {kind}");

        Ok(kind)
    }

    /// Cancel the running effect (if any) without touching the strip.
    pub async fn preempt(&self) -> Option<EffectKind> {
        let _transition = self.transition.lock().await;
        self.cancel_active().await
    }

    /// Cancel the running effect and turn every LED off.
    ///
    /// The engine is `Idle` afterwards even if the blanking frame fails.
    pub async fn stop_all(&self) -> Result<Option<EffectKind>, ControlError> {
        let _transition = self.transition.lock().await;
        let stopped = self.cancel_active().await;

        let led_count = match self.cache.refresh().await {
            Some(config) => config.led_count,
            None => self.cache.current().led_count,
        };
        if led_count == 0 {
            return Err(if self.cache.is_known() {
                ControlError::NoLeds
            } else {
                ControlError::DriverUnavailable
            });
        }

        let result = self
            .bus
            .send_frame(
                Frame::fill(led_count, Rgb::BLACK).into_commands(),
                Budget::Direct,
            )
            .await;
        if !result.success {
            return Err(ControlError::Command(
                result
                    .error_message
                    .unwrap_or_else(|| "clear failed".to_string()),
            ));
        }
        Ok(stopped)
    }

    /// Raise the current session's cancel flag and wait for its task.
    async fn cancel_active(&self) -> Option<EffectKind> {
        // An earlier transition may have been dropped before its task exited
        let draining = self.draining.lock().take();
        if let Some(task) = draining {
            Teardown::new(self, task).join().await;
        }

        let session = self.slot.lock().take()?;
        let kind = session.kind;
        debug!("Cancelling session {} ({kind})", session.id);
        session.cancel.cancel();
        Teardown::new(self, session.task).join().await;
        Some(kind)
    }
}

/// Waits out a cancelled session's task, leaving the engine `Idle`.
///
/// If the waiting caller is dropped first, the task handle is parked in
/// `draining` so the next transition still waits for it.
struct Teardown<'a> {
    engine: &'a EffectEngine,
    task: Option<JoinHandle<()>>,
}

impl<'a> Teardown<'a> {
    fn new(engine: &'a EffectEngine, task: JoinHandle<()>) -> Self {
        Self {
            engine,
            task: Some(task),
        }
    }

    async fn join(mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                warn!("Effect task ended abnormally: {e}");
            }
        }
        self.task = None;
    }
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Transition abandoned; effect task left draining");
            *self.engine.draining.lock() = Some(task);
        }
        self.engine.state.send_replace(EngineState::Idle);
    }
}

/// What a spawned session needs to play frames and release itself.
struct Playback {
    id: u64,
    bus: DriverBus,
    pacer: Arc<dyn Pacer>,
    cancel: CancelToken,
    slot: Slot,
    state: Arc<watch::Sender<EngineState>>,
    counters: Arc<Counters>,
}

impl Playback {
    async fn send(&self, frame: Frame) {
        let result = self
            .bus
            .send_frame(frame.into_commands(), Budget::Effect)
            .await;
        self.counters.frames_sent.fetch_add(1, Ordering::Relaxed);
        if !result.success {
            // Best effort: a dropped frame doesn't stop the sequence
            self.counters.failed_frames.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Effect frame dropped: {}",
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }

    /// Return the engine to `Idle` if this is still the active session.
    fn release(&self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|s| s.id == self.id) {
            *slot = None;
            self.state.send_replace(EngineState::Idle);
        }
    }
}

async fn run_session(sequence: Sequence, playback: Playback) {
    let kind = sequence.kind();
    if AssertUnwindSafe(play(sequence, &playback))
        .catch_unwind()
        .await
        .is_err()
    {
        error!("{kind} effect task panicked");
    }
    playback.release();
}

async fn play(mut sequence: Sequence, pb: &Playback) {
    let kind = sequence.kind();
    info!("{kind} effect started on {} LEDs", sequence.led_count());

    loop {
        if pb.cancel.is_cancelled() {
            break;
        }
        let Some(step) = sequence.next_step() else {
            break;
        };
        pb.send(step.frame).await;

        tokio::select! {
            biased;
            _ = pb.cancel.cancelled() => {}
            _ = pb.pacer.wait(step.delay) => {}
        }
    }

    let cancelled = pb.cancel.is_cancelled();
    if let Some(frame) = sequence.finish() {
        pb.send(frame).await;
    }

    if cancelled {
        pb.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        info!("{kind} effect cancelled after {} steps", sequence.position());
    } else {
        pb.counters.completed.fetch_add(1, Ordering::Relaxed);
        info!("{kind} effect finished ({} steps)", sequence.position());
    }
}
