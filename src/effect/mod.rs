//! Time-stepped LED effects.
//!
//! An [`Effect`] is a parameter set. [`Sequence`] turns it into a list of
//! frames with inter-frame delays, one step at a time, without touching
//! timers or the driver. [`EffectEngine`] owns the single running session
//! and plays a sequence onto the driver through the command lane.
//!
//! ```text
//! Effect ──► Sequence::next_step() ──► Frame ──► DriverBus (Budget::Effect)
//!                     ▲                              │
//!                     └──── Pacer::wait(delay) ◄─────┘   (cancel checked here)
//! ```

pub mod engine;
pub mod pacer;
pub mod sequence;

pub use engine::{EffectEngine, EngineState, EngineStats};
pub use pacer::{CancelToken, Pacer, TokioPacer};
pub use sequence::{Frame, Sequence, Step};

use ledstrip_transport::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ControlError;

/// Upper bound for chase window lengths and sparkle counts.
pub const MAX_EFFECT_SPAN: usize = 10_000;

/// Effect kinds the engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Rainbow,
    Wave,
    Breathe,
    Sparkle,
    Chase,
    FadeTransition,
    InfiniteChase,
}

impl EffectKind {
    pub const ALL: &'static [EffectKind] = &[
        EffectKind::Rainbow,
        EffectKind::Wave,
        EffectKind::Breathe,
        EffectKind::Sparkle,
        EffectKind::Chase,
        EffectKind::FadeTransition,
        EffectKind::InfiniteChase,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            EffectKind::Rainbow => "Rainbow",
            EffectKind::Wave => "Wave",
            EffectKind::Breathe => "Breathe",
            EffectKind::Sparkle => "Sparkle",
            EffectKind::Chase => "Chase",
            EffectKind::FadeTransition => "Fade transition",
            EffectKind::InfiniteChase => "Infinite chase",
        }
    }

    /// Whether the sequence ends on its own
    pub fn is_finite(&self) -> bool {
        !matches!(self, EffectKind::InfiniteChase)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// An effect request with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Rainbow {
        delay_ms: u64,
    },
    Wave {
        color: Rgb,
        delay_ms: u64,
    },
    Breathe {
        color: Rgb,
        duration_ms: u64,
    },
    Sparkle {
        color: Rgb,
        count: usize,
        duration_ms: u64,
    },
    Chase {
        color: Rgb,
        length: usize,
        delay_ms: u64,
    },
    FadeTransition {
        from: Rgb,
        to: Rgb,
        duration_ms: u64,
    },
    InfiniteChase {
        color: Rgb,
        length: usize,
        delay_ms: u64,
    },
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Rainbow { .. } => EffectKind::Rainbow,
            Effect::Wave { .. } => EffectKind::Wave,
            Effect::Breathe { .. } => EffectKind::Breathe,
            Effect::Sparkle { .. } => EffectKind::Sparkle,
            Effect::Chase { .. } => EffectKind::Chase,
            Effect::FadeTransition { .. } => EffectKind::FadeTransition,
            Effect::InfiniteChase { .. } => EffectKind::InfiniteChase,
        }
    }

    /// Reject window lengths and pick counts above [`MAX_EFFECT_SPAN`].
    pub fn check_span(&self) -> Result<(), ControlError> {
        let (name, value) = match *self {
            Effect::Chase { length, .. } | Effect::InfiniteChase { length, .. } => {
                ("Chase length", length)
            }
            Effect::Sparkle { count, .. } => ("Sparkle count", count),
            _ => return Ok(()),
        };
        if value > MAX_EFFECT_SPAN {
            return Err(ControlError::ParameterTooLarge {
                name,
                value,
                max: MAX_EFFECT_SPAN,
            });
        }
        Ok(())
    }

    /// The effect with its documented default parameters.
    pub fn with_defaults(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Rainbow => Effect::Rainbow { delay_ms: 100 },
            EffectKind::Wave => Effect::Wave {
                color: Rgb::new(0, 0, 255),
                delay_ms: 50,
            },
            EffectKind::Breathe => Effect::Breathe {
                color: Rgb::WHITE,
                duration_ms: 2000,
            },
            EffectKind::Sparkle => Effect::Sparkle {
                color: Rgb::WHITE,
                count: 5,
                duration_ms: 5000,
            },
            EffectKind::Chase => Effect::Chase {
                color: Rgb::new(255, 0, 0),
                length: 3,
                delay_ms: 100,
            },
            EffectKind::FadeTransition => Effect::FadeTransition {
                from: Rgb::new(255, 0, 0),
                to: Rgb::new(0, 0, 255),
                duration_ms: 1000,
            },
            EffectKind::InfiniteChase => Effect::InfiniteChase {
                color: Rgb::new(0, 255, 0),
                length: 3,
                delay_ms: 100,
            },
        }
    }
}
