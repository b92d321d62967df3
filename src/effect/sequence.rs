//! Per-effect frame generation.
//!
//! A [`Sequence`] is an explicit state machine: each call to
//! [`Sequence::next_step`] advances the step index and returns the frame to
//! show plus how long to hold it. Nothing here sleeps or does I/O, so the
//! engine can pause, cancel, or drive it from tests step by step.

use std::time::Duration;

use ledstrip_transport::{DriverCommand, DriverConfig, PixelCommand, Rgb};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{Effect, EffectKind};

/// Rainbow palette: red, orange, yellow, green, blue, indigo, violet.
pub const RAINBOW: [Rgb; 7] = [
    Rgb::new(255, 0, 0),
    Rgb::new(255, 127, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(75, 0, 130),
    Rgb::new(148, 0, 211),
];

const BREATHE_HALF_STEPS: usize = 50;
const FADE_STEPS: usize = 50;
const SPARKLE_FRAME_MS: u64 = 100;

/// What one step writes to the strip.
///
/// Becomes at most one buffer write, at most one brightness change, and
/// exactly one `show`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub pixels: Option<Vec<PixelCommand>>,
    pub brightness: Option<f32>,
}

impl Frame {
    pub fn pixels(pixels: Vec<PixelCommand>) -> Self {
        Self {
            pixels: Some(pixels),
            brightness: None,
        }
    }

    pub fn brightness(level: f32) -> Self {
        Self {
            pixels: None,
            brightness: Some(level),
        }
    }

    pub fn fill(led_count: usize, color: Rgb) -> Self {
        Self::pixels(solid(led_count, color))
    }

    /// Color at `index`, if this frame writes pixels
    pub fn color_at(&self, index: usize) -> Option<Rgb> {
        self.pixels
            .as_ref()?
            .iter()
            .find(|p| p.index == index)
            .map(|p| p.color)
    }

    /// Indices written with a non-black color
    pub fn lit(&self) -> Vec<usize> {
        self.pixels
            .iter()
            .flatten()
            .filter(|p| p.color != Rgb::BLACK)
            .map(|p| p.index)
            .collect()
    }

    /// Driver commands for this frame, ending in a single `show`.
    pub fn into_commands(self) -> Vec<DriverCommand> {
        let mut cmds = Vec::with_capacity(3);
        if let Some(pixels) = self.pixels {
            cmds.push(DriverCommand::SetPixels { pixels });
        }
        if let Some(level) = self.brightness {
            cmds.push(DriverCommand::brightness(level));
        }
        cmds.push(DriverCommand::Show);
        cmds
    }
}

/// One frame and how long to hold it.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub frame: Frame,
    pub delay: Duration,
}

fn solid(led_count: usize, color: Rgb) -> Vec<PixelCommand> {
    (0..led_count).map(|i| PixelCommand::new(i, color)).collect()
}

/// Full-strip frame with `lit` indices in `color`, everything else off.
fn frame_with(led_count: usize, color: Rgb, lit: impl Fn(usize) -> bool) -> Frame {
    Frame::pixels(
        (0..led_count)
            .map(|i| PixelCommand::new(i, if lit(i) { color } else { Rgb::BLACK }))
            .collect(),
    )
}

enum Program {
    Rainbow {
        delay: Duration,
    },
    Wave {
        color: Rgb,
        delay: Duration,
    },
    Breathe {
        color: Rgb,
        delay: Duration,
        restore: f32,
    },
    Sparkle {
        color: Rgb,
        count: usize,
        duration_ms: u64,
        rng: SmallRng,
    },
    Chase {
        color: Rgb,
        length: usize,
        delay: Duration,
        repeat: bool,
    },
    Fade {
        from: Rgb,
        to: Rgb,
        delay: Duration,
    },
}

/// Step-wise playback state for one effect run.
pub struct Sequence {
    kind: EffectKind,
    led_count: usize,
    program: Program,
    step: usize,
}

impl Sequence {
    /// Build a sequence sized from a config snapshot.
    pub fn new(effect: &Effect, config: DriverConfig) -> Self {
        Self::with_rng(effect, config, SmallRng::from_entropy())
    }

    /// Like [`Sequence::new`] with a reproducible sparkle pattern.
    pub fn seeded(effect: &Effect, config: DriverConfig, seed: u64) -> Self {
        Self::with_rng(effect, config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(effect: &Effect, config: DriverConfig, rng: SmallRng) -> Self {
        let ms = Duration::from_millis;
        let program = match *effect {
            Effect::Rainbow { delay_ms } => Program::Rainbow {
                delay: ms(delay_ms),
            },
            Effect::Wave { color, delay_ms } => Program::Wave {
                color,
                delay: ms(delay_ms),
            },
            Effect::Breathe { color, duration_ms } => Program::Breathe {
                color,
                delay: ms(duration_ms / (2 * BREATHE_HALF_STEPS) as u64),
                restore: config.brightness,
            },
            Effect::Sparkle {
                color,
                count,
                duration_ms,
            } => Program::Sparkle {
                color,
                count,
                duration_ms,
                rng,
            },
            Effect::Chase {
                color,
                length,
                delay_ms,
            } => Program::Chase {
                color,
                length,
                delay: ms(delay_ms),
                repeat: false,
            },
            Effect::InfiniteChase {
                color,
                length,
                delay_ms,
            } => Program::Chase {
                color,
                length,
                delay: ms(delay_ms),
                repeat: true,
            },
            Effect::FadeTransition {
                from,
                to,
                duration_ms,
            } => Program::Fade {
                from,
                to,
                delay: ms(duration_ms / FADE_STEPS as u64),
            },
        };

        Self {
            kind: effect.kind(),
            led_count: config.led_count,
            program,
            step: 0,
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Steps emitted so far
    pub fn position(&self) -> usize {
        self.step
    }

    /// Total steps, `None` for sequences that never end on their own.
    pub fn total_steps(&self) -> Option<usize> {
        match &self.program {
            Program::Rainbow { .. } => Some(RAINBOW.len()),
            Program::Wave { .. } => Some(self.led_count),
            Program::Breathe { .. } => Some(2 * BREATHE_HALF_STEPS),
            Program::Sparkle { duration_ms, .. } => {
                Some(duration_ms.div_ceil(SPARKLE_FRAME_MS) as usize)
            }
            Program::Chase { repeat: true, .. } => None,
            Program::Chase { length, .. } => Some(self.led_count.saturating_add(*length)),
            Program::Fade { .. } => Some(FADE_STEPS + 1),
        }
    }

    pub fn remaining(&self) -> Option<usize> {
        self.total_steps().map(|t| t.saturating_sub(self.step))
    }

    /// Advance one step. `None` once the sequence is exhausted.
    pub fn next_step(&mut self) -> Option<Step> {
        if self.remaining() == Some(0) {
            return None;
        }
        let i = self.step;
        let n = self.led_count;

        let step = match &mut self.program {
            Program::Rainbow { delay } => Step {
                frame: Frame::fill(n, RAINBOW[i]),
                delay: *delay,
            },
            Program::Wave { color, delay } => Step {
                frame: frame_with(n, *color, |p| p == i),
                delay: *delay,
            },
            Program::Breathe { color, delay, .. } => {
                let half = BREATHE_HALF_STEPS;
                let ramp = (i % half) as f32 / (half - 1) as f32;
                let level = if i < half { ramp } else { 1.0 - ramp };
                let frame = if i == 0 {
                    Frame {
                        pixels: Some(solid(n, *color)),
                        brightness: Some(level),
                    }
                } else {
                    Frame::brightness(level)
                };
                Step {
                    frame,
                    delay: *delay,
                }
            }
            Program::Sparkle {
                color, count, rng, ..
            } => {
                // With replacement: duplicates light fewer distinct LEDs
                let mut lit = vec![false; n];
                if n > 0 {
                    for _ in 0..*count {
                        lit[rng.gen_range(0..n)] = true;
                    }
                }
                Step {
                    frame: frame_with(n, *color, |p| lit[p]),
                    delay: Duration::from_millis(SPARKLE_FRAME_MS),
                }
            }
            Program::Chase {
                color,
                length,
                delay,
                repeat,
            } => {
                let sweep = n.saturating_add(*length).max(1);
                let start = if *repeat { i % sweep } else { i };
                let end = start.saturating_add(*length);
                Step {
                    frame: frame_with(n, *color, |p| p >= start && p < end),
                    delay: *delay,
                }
            }
            Program::Fade { from, to, delay } => {
                let t = i as f32 / FADE_STEPS as f32;
                Step {
                    frame: Frame::fill(n, Rgb::lerp(*from, *to, t)),
                    delay: *delay,
                }
            }
        };

        self.step += 1;
        Some(step)
    }

    /// Cleanup frame to send when the run ends, naturally or cancelled.
    pub fn finish(&self) -> Option<Frame> {
        match &self.program {
            Program::Sparkle { .. } => Some(Frame::fill(self.led_count, Rgb::BLACK)),
            Program::Breathe { restore, .. } if self.step > 0 => {
                Some(Frame::brightness(*restore))
            }
            _ => None,
        }
    }
}
