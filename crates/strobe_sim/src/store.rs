//! Committed and staged signal values.

use strobe_common::BitVec;
use strobe_ir::{Netlist, SignalId};

/// A committed value replaced by a [`SignalStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// The signal whose value changed.
    pub signal: SignalId,
    /// Value before the commit.
    pub old: BitVec,
    /// Value after the commit.
    pub new: BitVec,
}

/// Holds one committed and at most one staged value per signal.
///
/// Readers only ever see committed values. Staged values become visible
/// all at once when their signals are committed. Every stored value has
/// exactly its signal's declared width.
#[derive(Debug, Clone)]
pub struct SignalStore {
    committed: Vec<BitVec>,
    staged: Vec<Option<BitVec>>,
    widths: Vec<u32>,
}

impl SignalStore {
    /// Creates a store holding every signal's initial value.
    pub fn new(netlist: &Netlist) -> Self {
        let committed: Vec<BitVec> = netlist.signals().values().map(|s| s.init.clone()).collect();
        let widths = netlist.signals().values().map(|s| s.width).collect();
        Self {
            staged: vec![None; committed.len()],
            committed,
            widths,
        }
    }

    /// Returns the number of signals.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Returns `true` if the store holds no signals.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Returns `true` if `signal` has a slot in this store.
    pub fn contains(&self, signal: SignalId) -> bool {
        signal.index() < self.committed.len()
    }

    /// Returns the committed value of `signal`.
    ///
    /// # Panics
    ///
    /// Panics if `signal` is not part of the netlist the store was built from.
    pub fn get(&self, signal: SignalId) -> &BitVec {
        &self.committed[signal.index()]
    }

    /// Returns the declared width of `signal`.
    pub fn width(&self, signal: SignalId) -> u32 {
        self.widths[signal.index()]
    }

    /// Records a pending value, truncated to the signal's width.
    ///
    /// A later stage of the same signal replaces the earlier one.
    pub fn stage(&mut self, signal: SignalId, value: BitVec) {
        let width = self.widths[signal.index()];
        let value = if value.width() == width {
            value
        } else {
            value.resize(width)
        };
        self.staged[signal.index()] = Some(value);
    }

    /// Returns the staged value of `signal`, if any.
    pub fn staged(&self, signal: SignalId) -> Option<&BitVec> {
        self.staged[signal.index()].as_ref()
    }

    /// Replaces the committed values of exactly `signals` with their staged
    /// values and clears those staged entries.
    ///
    /// Signals with nothing staged are skipped. Returns the signals whose
    /// value actually changed, in the order given.
    pub fn commit(&mut self, signals: &[SignalId]) -> Vec<Change> {
        let mut changes = Vec::new();
        for &signal in signals {
            let Some(new) = self.staged[signal.index()].take() else {
                continue;
            };
            let slot = &mut self.committed[signal.index()];
            if *slot != new {
                let old = std::mem::replace(slot, new.clone());
                changes.push(Change { signal, old, new });
            }
        }
        changes
    }

    /// Returns all committed values, indexed by signal.
    pub fn values(&self) -> &[BitVec] {
        &self.committed
    }
}
