//! Clock domains: a clock signal, its active edge, and an optional reset.

use crate::ids::{DomainId, SignalId};
use serde::{Deserialize, Serialize};
use strobe_common::Ident;

/// The clock transition that triggers a domain's registered updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// 0 → 1 transition.
    Posedge,
    /// 1 → 0 transition.
    Negedge,
}

impl Edge {
    /// Returns `true` if a transition from `prev` to `curr` is this edge.
    pub fn matches(self, prev: bool, curr: bool) -> bool {
        match self {
            Edge::Posedge => !prev && curr,
            Edge::Negedge => prev && !curr,
        }
    }

    /// The clock level reached right after this edge.
    pub fn active_level(self) -> bool {
        matches!(self, Edge::Posedge)
    }
}

/// Which level of a reset signal asserts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Asserted when the signal is 1.
    ActiveHigh,
    /// Asserted when the signal is 0.
    ActiveLow,
}

impl Polarity {
    /// Returns `true` if a signal at `level` is asserted under this polarity.
    pub fn is_asserted(self, level: bool) -> bool {
        match self {
            Polarity::ActiveHigh => level,
            Polarity::ActiveLow => !level,
        }
    }
}

/// A synchronous reset input of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSpec {
    /// The reset signal (1 bit wide).
    pub signal: SignalId,
    /// The asserted level.
    pub polarity: Polarity,
}

/// A named clock/reset context governing a group of registered rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    /// Index of this domain in the netlist.
    pub id: DomainId,
    /// Interned domain name (e.g. `sync`).
    pub name: Ident,
    /// The clock signal (1 bit wide).
    pub clock: SignalId,
    /// The active clock edge.
    pub edge: Edge,
    /// Optional synchronous reset.
    pub reset: Option<ResetSpec>,
}
