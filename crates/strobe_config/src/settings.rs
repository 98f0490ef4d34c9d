//! Configuration types deserialized from `strobe.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level configuration parsed from `strobe.toml`.
///
/// Every section is optional; an empty file yields the engine defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrobeConfig {
    /// Where the netlist lives.
    #[serde(default)]
    pub netlist: NetlistSection,
    /// Engine settings.
    #[serde(default)]
    pub sim: SimSettings,
    /// Clock generators, keyed by domain name.
    #[serde(default)]
    pub clocks: BTreeMap<String, ClockDef>,
    /// Which coverage observers to attach.
    #[serde(default)]
    pub coverage: CoverageSettings,
}

/// The `[netlist]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetlistSection {
    /// Path to the netlist JSON file, relative to the configuration file.
    pub path: Option<String>,
}

/// The `[sim]` section: engine limits and checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimSettings {
    /// Settle rounds allowed before a loop is reported as non-converging.
    #[serde(default = "default_max_settle_iterations")]
    pub max_settle_iterations: u32,
    /// Stop after this many clock cycles.
    pub max_cycles: Option<u64>,
    /// Stop at this simulated time, e.g. `"10us"`.
    pub time_limit: Option<String>,
    /// Reject combinational cycles before the run starts.
    #[serde(default = "default_true")]
    pub static_loop_check: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            max_settle_iterations: default_max_settle_iterations(),
            max_cycles: None,
            time_limit: None,
            static_loop_check: true,
        }
    }
}

fn default_max_settle_iterations() -> u32 {
    strobe_sim::DEFAULT_MAX_SETTLE_ITERATIONS
}

fn default_true() -> bool {
    true
}

/// A clock generator definition: exactly one of `period` or `frequency`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockDef {
    /// The clock period as a duration string (e.g. `"10ns"`).
    pub period: Option<String>,
    /// The clock frequency (e.g. `"100MHz"`), parsed to
    /// [`Frequency`](strobe_common::Frequency).
    pub frequency: Option<String>,
}

/// The `[coverage]` section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoverageSettings {
    /// Record statement hit counts.
    #[serde(default)]
    pub statement: bool,
    /// Record per-bit toggle counts.
    #[serde(default)]
    pub toggle: bool,
}
