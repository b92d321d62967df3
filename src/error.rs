//! Control-layer error types
//!
//! These never escape `LedController`; they become the message of a
//! failed `OpResult`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// `get_config` could not be answered
    #[error("LED driver unreachable")]
    DriverUnavailable,

    /// Driver answered but has no LEDs configured
    #[error("Driver reports 0 LEDs")]
    NoLeds,

    #[error("Pixel index {index} out of range (strip has {led_count} LEDs)")]
    IndexOutOfRange { index: usize, led_count: usize },

    #[error("Range {start}..={end} covers no LEDs (strip has {led_count})")]
    EmptyRange {
        start: usize,
        end: usize,
        led_count: usize,
    },

    /// Effect parameter beyond what any strip can use
    #[error("{name} {value} exceeds the limit of {max}")]
    ParameterTooLarge {
        name: &'static str,
        value: usize,
        max: usize,
    },

    /// The driver rejected or never received a command
    #[error("{0}")]
    Command(String),
}
