// CLI definitions using clap

use clap::{Parser, Subcommand};
use ledstrip_transport::Rgb;
use std::path::PathBuf;

use crate::effect::Effect;

#[derive(Parser)]
#[command(name = "ledctl")]
#[command(author, version, about = "Control an addressable LED strip through its driver service")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (default: ~/.config/ledctl/ledctl.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Driver base URL, overrides the settings file
    #[arg(long, global = true, value_name = "URL")]
    pub driver_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Strict `#rrggbb` / `rrggbb` parser for command-line colors.
pub fn parse_color(s: &str) -> Result<Rgb, String> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    if digits.len() == 6 && digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        Ok(Rgb::from_hex(digits))
    } else {
        Err(format!("expected a color like #ff8800, got '{s}'"))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    // === Query Commands ===
    /// Show driver status (LED count, brightness, queue)
    #[command(visible_aliases = ["st"])]
    Status,

    /// Show strip configuration reported by the driver
    #[command(visible_aliases = ["cfg"])]
    Config,

    // === Direct Pixel Commands ===
    /// Set one pixel
    #[command(visible_aliases = ["px"])]
    Pixel {
        index: usize,
        #[arg(value_parser = parse_color)]
        color: Rgb,
    },

    /// Set an inclusive range of pixels to one color
    Range {
        start: usize,
        end: usize,
        #[arg(value_parser = parse_color)]
        color: Rgb,
    },

    /// Set every pixel to one color
    Fill {
        #[arg(value_parser = parse_color)]
        color: Rgb,
    },

    /// Turn every pixel off
    #[command(visible_aliases = ["off"])]
    Clear,

    /// Set global brightness (0.0-1.0, clamped)
    #[command(visible_aliases = ["br"])]
    Brightness {
        #[arg(allow_negative_numbers = true)]
        value: f32,
    },

    // === Effects ===
    /// Run an effect in the foreground until it ends or Ctrl-C
    #[command(visible_aliases = ["fx"])]
    Effect {
        #[command(subcommand)]
        effect: EffectCommand,
    },

    /// Stop any running effect and turn the strip off
    Stop,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum EffectCommand {
    /// Cycle the whole strip through the rainbow
    Rainbow {
        #[arg(short, long, default_value_t = 100)]
        delay: u64,
    },

    /// Sweep a color along the strip one pixel at a time
    Wave {
        #[arg(value_parser = parse_color, default_value = "#0000ff")]
        color: Rgb,
        #[arg(short, long, default_value_t = 50)]
        delay: u64,
    },

    /// Fade brightness up and down once
    Breathe {
        #[arg(value_parser = parse_color, default_value = "#ffffff")]
        color: Rgb,
        #[arg(short = 't', long, default_value_t = 2000)]
        duration: u64,
    },

    /// Flash random pixels
    Sparkle {
        #[arg(value_parser = parse_color, default_value = "#ffffff")]
        color: Rgb,
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        #[arg(short = 't', long, default_value_t = 5000)]
        duration: u64,
    },

    /// Run a lit window across the strip once
    Chase {
        #[arg(value_parser = parse_color, default_value = "#ff0000")]
        color: Rgb,
        #[arg(short, long, default_value_t = 3)]
        length: usize,
        #[arg(short, long, default_value_t = 100)]
        delay: u64,
    },

    /// Crossfade the whole strip between two colors
    #[command(visible_aliases = ["fade"])]
    FadeTransition {
        #[arg(value_parser = parse_color, default_value = "#ff0000")]
        from: Rgb,
        #[arg(value_parser = parse_color, default_value = "#0000ff")]
        to: Rgb,
        #[arg(short = 't', long, default_value_t = 1000)]
        duration: u64,
    },

    /// Chase that wraps around until stopped
    InfiniteChase {
        #[arg(value_parser = parse_color, default_value = "#00ff00")]
        color: Rgb,
        #[arg(short, long, default_value_t = 3)]
        length: usize,
        #[arg(short, long, default_value_t = 100)]
        delay: u64,
    },
}

impl EffectCommand {
    pub fn to_effect(&self) -> Effect {
        match *self {
            EffectCommand::Rainbow { delay } => Effect::Rainbow { delay_ms: delay },
            EffectCommand::Wave { color, delay } => Effect::Wave {
                color,
                delay_ms: delay,
            },
            EffectCommand::Breathe { color, duration } => Effect::Breathe {
                color,
                duration_ms: duration,
            },
            EffectCommand::Sparkle {
                color,
                count,
                duration,
            } => Effect::Sparkle {
                color,
                count,
                duration_ms: duration,
            },
            EffectCommand::Chase {
                color,
                length,
                delay,
            } => Effect::Chase {
                color,
                length,
                delay_ms: delay,
            },
            EffectCommand::FadeTransition { from, to, duration } => Effect::FadeTransition {
                from,
                to,
                duration_ms: duration,
            },
            EffectCommand::InfiniteChase {
                color,
                length,
                delay,
            } => Effect::InfiniteChase {
                color,
                length,
                delay_ms: delay,
            },
        }
    }
}
