//! Clock frequencies with unit parsing, used to derive simulated clock periods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds in one second.
const FS_PER_SECOND: f64 = 1e15;

/// A clock frequency stored in Hertz.
///
/// Parses strings like `"50MHz"`, `"100kHz"`, `"1GHz"` and bare numbers
/// (interpreted as Hz).
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a new frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the clock period rounded to whole femtoseconds.
    ///
    /// Returns `None` for non-positive or non-finite frequencies, and for
    /// frequencies so high the period rounds to zero.
    pub fn period_fs(&self) -> Option<u64> {
        if !self.0.is_finite() || self.0 <= 0.0 {
            return None;
        }
        let period = (FS_PER_SECOND / self.0).round();
        if period < 1.0 || period > u64::MAX as f64 {
            return None;
        }
        Some(period as u64)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000_000.0 {
            write!(f, "{}GHz", hz / 1_000_000_000.0)
        } else if hz >= 1_000_000.0 {
            write!(f, "{}MHz", hz / 1_000_000.0)
        } else if hz >= 1_000.0 {
            write!(f, "{}kHz", hz / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("ghz") {
            (num, 1e9)
        } else if let Some(num) = lower.strip_suffix("mhz") {
            (num, 1e6)
        } else if let Some(num) = lower.strip_suffix("khz") {
            (num, 1e3)
        } else if let Some(num) = lower.strip_suffix("hz") {
            (num, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let val: f64 = num.trim().parse().map_err(|_| err())?;
        if !val.is_finite() || val <= 0.0 {
            return Err(err());
        }
        Ok(Frequency(val * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!("1GHz".parse::<Frequency>().unwrap().hz(), 1e9);
        assert_eq!("50MHz".parse::<Frequency>().unwrap().hz(), 50e6);
        assert_eq!("100kHz".parse::<Frequency>().unwrap().hz(), 100e3);
        assert_eq!("48000Hz".parse::<Frequency>().unwrap().hz(), 48_000.0);
    }

    #[test]
    fn parse_bare_number_and_case() {
        assert_eq!("25000000".parse::<Frequency>().unwrap().hz(), 25e6);
        assert_eq!("50mhz".parse::<Frequency>().unwrap().period_fs(), Some(20_000_000));
    }

    #[test]
    fn parse_rejects_garbage_and_non_positive() {
        assert!("fast".parse::<Frequency>().is_err());
        assert!("0MHz".parse::<Frequency>().is_err());
        assert!("-5Hz".parse::<Frequency>().is_err());
    }

    #[test]
    fn period_in_femtoseconds() {
        assert_eq!(Frequency::new(1e6).period_fs(), Some(1_000_000_000));
        assert_eq!(Frequency::new(100e6).period_fs(), Some(10_000_000));
        assert_eq!(Frequency::new(0.0).period_fs(), None);
        assert_eq!(Frequency::new(1e18).period_fs(), None);
    }

    #[test]
    fn display_selects_unit() {
        assert_eq!(Frequency::new(50e6).to_string(), "50MHz");
        assert_eq!(Frequency::new(44_100.0).to_string(), "44.1kHz");
        assert_eq!(Frequency::new(500.0).to_string(), "500Hz");
    }

    #[test]
    fn error_display() {
        let err = "nope".parse::<Frequency>().unwrap_err();
        assert_eq!(err.to_string(), "invalid frequency: 'nope'");
    }
}
