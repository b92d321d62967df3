//! Color conversion utilities
//!
//! Colors travel over the wire as `"#rrggbb"` strings. Parsing is
//! deliberately permissive: anything that is not six hex digits (with an
//! optional leading `#`) becomes black.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `"#RRGGBB"` / `"RRGGBB"`, falling back to black.
    pub fn from_hex(s: &str) -> Self {
        hex_to_rgb(s)
    }

    /// Format as lowercase `"#rrggbb"`.
    pub fn to_hex(self) -> String {
        rgb_to_hex(self.r as i32, self.g as i32, self.b as i32)
    }

    /// Linearly interpolate each channel independently, rounding to nearest.
    pub fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
        Rgb {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(hex_to_rgb(&s))
    }
}

/// Convert a hex color string to RGB.
///
/// Malformed input yields black rather than an error.
pub fn hex_to_rgb(hex: &str) -> Rgb {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        return Rgb::BLACK;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0);
    Rgb::new(channel(0), channel(2), channel(4))
}

/// Convert channel values to `"#rrggbb"`, clamping each to 0-255.
pub fn rgb_to_hex(r: i32, g: i32, b: i32) -> String {
    let c = |v: i32| v.clamp(0, 255) as u8;
    format!("#{:02x}{:02x}{:02x}", c(r), c(g), c(b))
}
