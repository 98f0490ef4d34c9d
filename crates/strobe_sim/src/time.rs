//! Simulated time with femtosecond resolution.
//!
//! Zero-delay semantics mean every settle and edge step happens at a single
//! [`SimTime`]; time advances only through clock generators and testbench
//! delays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;

/// A point in (or span of) simulated time, in femtoseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// Time zero.
    pub const ZERO: SimTime = SimTime(0);

    /// Creates a time from femtoseconds.
    pub fn from_fs(fs: u64) -> Self {
        Self(fs)
    }

    /// Creates a time from picoseconds.
    pub fn from_ps(ps: u64) -> Self {
        Self(ps * FS_PER_PS)
    }

    /// Creates a time from nanoseconds.
    pub fn from_ns(ns: u64) -> Self {
        Self(ns * FS_PER_NS)
    }

    /// Creates a time from microseconds.
    pub fn from_us(us: u64) -> Self {
        Self(us * FS_PER_US)
    }

    /// Returns the time in femtoseconds.
    pub fn as_fs(self) -> u64 {
        self.0
    }

    /// Converts to nanoseconds (truncated).
    pub fn to_ns(self) -> u64 {
        self.0 / FS_PER_NS
    }

    /// Adds `rhs`, returning `None` on overflow.
    pub fn checked_add(self, rhs: SimTime) -> Option<SimTime> {
        self.0.checked_add(rhs.0).map(SimTime)
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.0;
        if fs == 0 {
            write!(f, "0 fs")
        } else if fs >= FS_PER_MS && fs.is_multiple_of(FS_PER_MS) {
            write!(f, "{} ms", fs / FS_PER_MS)
        } else if fs >= FS_PER_US && fs.is_multiple_of(FS_PER_US) {
            write!(f, "{} us", fs / FS_PER_US)
        } else if fs >= FS_PER_NS && fs.is_multiple_of(FS_PER_NS) {
            write!(f, "{} ns", fs / FS_PER_NS)
        } else if fs >= FS_PER_PS && fs.is_multiple_of(FS_PER_PS) {
            write!(f, "{} ps", fs / FS_PER_PS)
        } else {
            write!(f, "{fs} fs")
        }
    }
}
