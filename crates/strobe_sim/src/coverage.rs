//! Built-in observers: statement coverage, toggle coverage and a trace digest.

use std::collections::BTreeMap;

use serde::Serialize;
use strobe_common::{ContentHash, StreamHasher};
use strobe_ir::{Netlist, SignalId, StatementId};

use crate::observer::{HookContext, Observer, Transition};

/// Counts executions of every statement, whether run by a rule or recorded
/// by a testbench.
#[derive(Debug, Default)]
pub struct StatementCoverage {
    hits: BTreeMap<StatementId, u64>,
}

impl StatementCoverage {
    /// Creates an observer with no recorded hits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one execution of `statement`.
    pub fn record_statement_hit(&mut self, statement: StatementId) {
        *self.hits.entry(statement).or_insert(0) += 1;
    }

    /// Returns the hits recorded so far.
    pub fn get_result(&self) -> StatementCoverageResult {
        StatementCoverageResult {
            hits: self.hits.clone(),
        }
    }
}

impl Observer for StatementCoverage {
    fn on_statement_hit(&mut self, _ctx: &HookContext<'_>, statement: StatementId) {
        self.record_statement_hit(statement);
    }
}

/// Statement hit counts. Statements never executed are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementCoverageResult {
    /// Hits per executed statement.
    pub hits: BTreeMap<StatementId, u64>,
}

impl StatementCoverageResult {
    /// Returns the hit count of `statement`, zero if it never ran.
    pub fn hits(&self, statement: StatementId) -> u64 {
        self.hits.get(&statement).copied().unwrap_or(0)
    }

    /// Lists every statement of `netlist` by name, including unexecuted ones.
    pub fn report(&self, netlist: &Netlist) -> StatementReport {
        let statements: Vec<StatementEntry> = netlist
            .statements()
            .ids()
            .map(|id| StatementEntry {
                name: netlist.statement_name(id),
                hits: self.hits(id),
            })
            .collect();
        let covered = statements.iter().filter(|s| s.hits > 0).count();
        StatementReport {
            total: statements.len(),
            covered,
            statements,
        }
    }
}

/// Statement coverage rendered by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementReport {
    /// Every statement, in ID order.
    pub statements: Vec<StatementEntry>,
    /// Statements executed at least once.
    pub covered: usize,
    /// All statements.
    pub total: usize,
}

impl StatementReport {
    /// Returns the percentage of statements executed, 100 for an empty netlist.
    pub fn percent(&self) -> f64 {
        percent(self.covered, self.total)
    }
}

/// One row of a [`StatementReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementEntry {
    /// Statement name.
    pub name: String,
    /// Execution count.
    pub hits: u64,
}

/// Direction of a single-bit toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleDirection {
    /// 0 → 1.
    ZeroToOne,
    /// 1 → 0.
    OneToZero,
}

/// Toggle counts of one bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToggleCounts {
    /// Number of 0 → 1 transitions.
    pub zero_to_one: u64,
    /// Number of 1 → 0 transitions.
    pub one_to_zero: u64,
}

impl ToggleCounts {
    /// Returns the count for `direction`.
    pub fn get(&self, direction: ToggleDirection) -> u64 {
        match direction {
            ToggleDirection::ZeroToOne => self.zero_to_one,
            ToggleDirection::OneToZero => self.one_to_zero,
        }
    }

    /// Returns `true` if the bit toggled in both directions.
    pub fn is_fully_toggled(&self) -> bool {
        self.zero_to_one > 0 && self.one_to_zero > 0
    }
}

/// Counts 0→1 and 1→0 transitions of every signal bit.
#[derive(Debug, Default)]
pub struct ToggleCoverage {
    counts: BTreeMap<SignalId, BTreeMap<u32, ToggleCounts>>,
}

impl ToggleCoverage {
    /// Creates an observer with no recorded toggles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the toggles recorded so far.
    pub fn get_result(&self) -> ToggleCoverageResult {
        ToggleCoverageResult {
            counts: self.counts.clone(),
        }
    }
}

impl Observer for ToggleCoverage {
    fn on_signal_transition(&mut self, _ctx: &HookContext<'_>, t: &Transition) {
        let counts = self
            .counts
            .entry(t.signal)
            .or_default()
            .entry(t.bit)
            .or_default();
        match (t.old, t.new) {
            (false, true) => counts.zero_to_one += 1,
            (true, false) => counts.one_to_zero += 1,
            _ => {}
        }
    }
}

/// Toggle counts per signal and bit. Bits that never changed are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToggleCoverageResult {
    /// signal → bit → counts.
    pub counts: BTreeMap<SignalId, BTreeMap<u32, ToggleCounts>>,
}

impl ToggleCoverageResult {
    /// Returns the counts of one bit, zero if it never changed.
    pub fn bit(&self, signal: SignalId, bit: u32) -> ToggleCounts {
        self.counts
            .get(&signal)
            .and_then(|bits| bits.get(&bit))
            .copied()
            .unwrap_or_default()
    }

    /// Returns the count of one bit in one direction.
    pub fn count(&self, signal: SignalId, bit: u32, direction: ToggleDirection) -> u64 {
        self.bit(signal, bit).get(direction)
    }

    /// Returns `true` if every bit of a `width`-bit signal toggled both ways.
    pub fn fully_toggled(&self, signal: SignalId, width: u32) -> bool {
        (0..width).all(|bit| self.bit(signal, bit).is_fully_toggled())
    }

    /// Lists every signal bit of `netlist` by name, including untoggled ones.
    pub fn report(&self, netlist: &Netlist) -> ToggleReport {
        let signals: Vec<SignalToggles> = netlist
            .signals()
            .iter()
            .map(|(id, sig)| SignalToggles {
                name: netlist.name(sig.name).to_string(),
                bits: (0..sig.width).map(|bit| self.bit(id, bit)).collect(),
            })
            .collect();
        let total_bits = signals.iter().map(|s| s.bits.len()).sum();
        let toggled_bits = signals
            .iter()
            .flat_map(|s| &s.bits)
            .filter(|b| b.is_fully_toggled())
            .count();
        ToggleReport {
            signals,
            toggled_bits,
            total_bits,
        }
    }
}

/// Toggle coverage rendered by signal name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleReport {
    /// Every signal, in ID order.
    pub signals: Vec<SignalToggles>,
    /// Bits toggled in both directions.
    pub toggled_bits: usize,
    /// All signal bits.
    pub total_bits: usize,
}

impl ToggleReport {
    /// Returns the percentage of fully toggled bits, 100 for an empty netlist.
    pub fn percent(&self) -> f64 {
        percent(self.toggled_bits, self.total_bits)
    }
}

/// One signal of a [`ToggleReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalToggles {
    /// Signal name.
    pub name: String,
    /// Counts per bit, LSB first.
    pub bits: Vec<ToggleCounts>,
}

/// Hashes every hook event into a digest, for comparing runs.
///
/// Two runs with the same digest observed the same statement hits and the
/// same transitions at the same times, in the same order.
#[derive(Debug, Default)]
pub struct TraceDigest {
    hasher: StreamHasher,
    transitions: u64,
    hits: u64,
}

impl TraceDigest {
    /// Creates an empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the digest of everything observed so far.
    pub fn get_result(&self) -> ContentHash {
        self.hasher.finish()
    }

    /// Returns the number of transitions observed.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Returns the number of statement hits observed.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

/// Tags separating the two hook kinds in the hashed stream.
const TAG_HIT: u64 = 0;
const TAG_TRANSITION: u64 = 1;

impl Observer for TraceDigest {
    fn on_statement_hit(&mut self, ctx: &HookContext<'_>, statement: StatementId) {
        self.hits += 1;
        self.hasher.update_u64(TAG_HIT);
        self.hasher.update_u64(ctx.time.as_fs());
        self.hasher.update_u64(statement.as_raw() as u64);
    }

    fn on_signal_transition(&mut self, ctx: &HookContext<'_>, t: &Transition) {
        self.transitions += 1;
        self.hasher.update_u64(TAG_TRANSITION);
        self.hasher.update_u64(ctx.time.as_fs());
        self.hasher.update_u64(t.signal.as_raw() as u64);
        self.hasher.update_u64(((t.bit as u64) << 2) | ((t.old as u64) << 1) | t.new as u64);
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
