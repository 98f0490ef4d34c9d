//! Signal declarations.

use crate::ids::SignalId;
use strobe_common::{BitVec, Ident};

/// A declared signal: a named bit-vector with an initial value.
///
/// Registered signals with a `reset` value take that value whenever their
/// domain's reset is asserted at an active edge. Signals without one are
/// reset-less and keep their computed next value.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Index of this signal in the netlist.
    pub id: SignalId,
    /// Interned signal name.
    pub name: Ident,
    /// Declared width in bits.
    pub width: u32,
    /// Value at the start of simulation.
    pub init: BitVec,
    /// Value forced by a domain reset, if any.
    pub reset: Option<BitVec>,
}

/// Declaration-time description of a signal, consumed by
/// [`NetlistBuilder::add_signal`](crate::builder::NetlistBuilder::add_signal).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub(crate) name: String,
    pub(crate) width: u32,
    pub(crate) init: BitVec,
    pub(crate) reset: Option<BitVec>,
}

impl SignalSpec {
    /// A signal of `width` bits that starts at zero and resets to zero.
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            init: BitVec::new(width),
            reset: Some(BitVec::new(width)),
        }
    }

    /// Sets both the initial and the reset value.
    pub fn init(mut self, value: u64) -> Self {
        self.init = BitVec::from_u64(value, 64);
        self.reset = Some(self.init.clone());
        self
    }

    /// Sets both the initial and the reset value from a bit-vector.
    pub fn init_bits(mut self, value: BitVec) -> Self {
        self.reset = Some(value.clone());
        self.init = value;
        self
    }

    /// Overrides the reset value without touching the initial value.
    pub fn reset(mut self, value: u64) -> Self {
        self.reset = Some(BitVec::from_u64(value, 64));
        self
    }

    /// Marks the signal reset-less: domain resets leave it untouched.
    pub fn reset_less(mut self) -> Self {
        self.reset = None;
        self
    }
}
