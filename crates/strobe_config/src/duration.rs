//! Duration strings such as `"10ns"` or `"2.5us"`.

use strobe_sim::time::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_US};
use strobe_sim::SimTime;

const FS_PER_S: u64 = FS_PER_MS * 1_000;

/// Parses a duration with a unit suffix (`fs`, `ps`, `ns`, `us`, `ms`, `s`).
///
/// A bare number is read as femtoseconds. Fractions are allowed as long as
/// the result rounds to a whole number of femtoseconds that fits in a
/// [`SimTime`]. Returns `None` for anything else.
pub fn parse_duration(s: &str) -> Option<SimTime> {
    let s = s.trim().to_ascii_lowercase();
    let (num, scale) = if let Some(num) = s.strip_suffix("fs") {
        (num, 1)
    } else if let Some(num) = s.strip_suffix("ps") {
        (num, FS_PER_PS)
    } else if let Some(num) = s.strip_suffix("ns") {
        (num, FS_PER_NS)
    } else if let Some(num) = s.strip_suffix("us") {
        (num, FS_PER_US)
    } else if let Some(num) = s.strip_suffix("ms") {
        (num, FS_PER_MS)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, FS_PER_S)
    } else {
        (s.as_str(), 1)
    };
    let num = num.trim();

    if let Ok(whole) = num.parse::<u64>() {
        return whole.checked_mul(scale).map(SimTime::from_fs);
    }
    let value: f64 = num.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let fs = (value * scale as f64).round();
    if fs > u64::MAX as f64 {
        return None;
    }
    Some(SimTime::from_fs(fs as u64))
}
