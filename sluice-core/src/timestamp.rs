//! Timestamp and time base handling for queued media.

use std::fmt;

/// A time base for interpreting timestamp ticks.
///
/// Common time bases:
/// - 1/90000 for MPEG-TS
/// - 1/48000 for 48kHz audio
/// - 1/1000 for milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl TimeBase {
    /// Standard MPEG time base (1/90000).
    pub const MPEG: Self = Self { num: 1, den: 90000 };

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self { num: 1, den: 1000 };

    /// Create a new time base from numerator and denominator.
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Convert a tick count in this time base to seconds.
    pub fn to_seconds(&self, value: i64) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        value as f64 * self.num as f64 / self.den as f64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MPEG
    }
}

/// A timestamp in stream ticks.
///
/// The sentinel [`Timestamp::NONE`] marks an undefined timestamp, matching
/// the convention of codec libraries that reserve the minimum value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// The raw tick value.
    pub value: i64,
}

impl Timestamp {
    /// Value representing an undefined timestamp.
    pub const NONE: i64 = i64::MIN;

    /// Create a new timestamp.
    pub const fn new(value: i64) -> Self {
        Self { value }
    }

    /// Create an undefined timestamp.
    pub const fn none() -> Self {
        Self { value: Self::NONE }
    }

    /// Check whether this timestamp carries a defined value.
    pub const fn is_valid(&self) -> bool {
        self.value != Self::NONE
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "NONE")
        }
    }
}
