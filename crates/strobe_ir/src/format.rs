//! JSON netlist description, as consumed by `strobe check` and `strobe run`.
//!
//! Signals and domains carry explicit numeric IDs which rules and
//! expressions refer to. IDs may be listed in any order but must be dense
//! (`0..n`) and unique. Statements are named by their rules; `statements`
//! lists extra ones that only testbenches record hits on.
//!
//! ```json
//! {
//!   "signals": [
//!     { "id": 0, "name": "clk", "width": 1 },
//!     { "id": 1, "name": "count", "width": 2 }
//!   ],
//!   "domains": [{ "id": 0, "name": "sync", "clock": 0, "edge": "posedge" }],
//!   "registered": [{
//!     "statement": "count_next", "domain": 0, "target": 1,
//!     "expr": { "binary": { "op": "add", "lhs": { "signal": 1 }, "rhs": { "const": "2'b01" } } }
//!   }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use strobe_common::BitVec;

use crate::builder::NetlistBuilder;
use crate::domain::{Edge, ResetSpec};
use crate::error::{ConfigurationError, NetlistError};
use crate::expr::Expr;
use crate::ids::{DomainId, SignalId};
use crate::netlist::Netlist;
use crate::signal::SignalSpec;

/// Top-level netlist file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetlistFile {
    /// Signal declarations.
    #[serde(default)]
    pub signals: Vec<SignalDecl>,
    /// Clock domain declarations.
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
    /// Combinational rules.
    #[serde(default)]
    pub comb: Vec<CombEntry>,
    /// Registered rules.
    #[serde(default)]
    pub registered: Vec<RegisteredEntry>,
    /// Statements with no rule, declared after all rule statements.
    #[serde(default)]
    pub statements: Vec<String>,
}

/// A signal declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalDecl {
    /// Dense numeric ID.
    pub id: SignalId,
    /// Unique signal name.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Initial value.
    #[serde(default)]
    pub init: u64,
    /// Reset value; defaults to `init`.
    #[serde(default)]
    pub reset: Option<u64>,
    /// If set, domain resets leave the signal untouched.
    #[serde(default)]
    pub reset_less: bool,
}

/// A clock domain declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainEntry {
    /// Dense numeric ID.
    pub id: DomainId,
    /// Unique domain name.
    pub name: String,
    /// The clock signal.
    pub clock: SignalId,
    /// The active edge.
    #[serde(default = "default_edge")]
    pub edge: Edge,
    /// Optional synchronous reset.
    #[serde(default)]
    pub reset: Option<ResetSpec>,
}

/// A combinational rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombEntry {
    /// Unique statement name.
    pub statement: String,
    /// The driven signal.
    pub target: SignalId,
    /// The driving expression.
    pub expr: Expr,
}

/// A registered rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisteredEntry {
    /// Unique statement name.
    pub statement: String,
    /// The governing domain.
    pub domain: DomainId,
    /// The registered signal.
    pub target: SignalId,
    /// The next-state expression.
    pub expr: Expr,
}

fn default_edge() -> Edge {
    Edge::Posedge
}

impl NetlistFile {
    /// Parses a netlist description from JSON text.
    pub fn from_json(json: &str) -> Result<Self, NetlistError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks ID density and replays the declarations into a builder.
    pub fn into_builder(self) -> Result<NetlistBuilder, ConfigurationError> {
        let mut signals = self.signals;
        signals.sort_by_key(|s| s.id);
        check_dense(
            "signal",
            signals.iter().map(|s| (s.id.as_raw(), s.name.as_str())),
        )?;
        let mut domains = self.domains;
        domains.sort_by_key(|d| d.id);
        check_dense(
            "domain",
            domains.iter().map(|d| (d.id.as_raw(), d.name.as_str())),
        )?;

        let mut builder = NetlistBuilder::new();
        for decl in signals {
            let mut spec =
                SignalSpec::new(decl.name, decl.width).init_bits(BitVec::from_u64(decl.init, 64));
            if let Some(reset) = decl.reset {
                spec = spec.reset(reset);
            }
            if decl.reset_less {
                spec = spec.reset_less();
            }
            builder.add_signal(spec);
        }
        for decl in domains {
            match decl.reset {
                Some(reset) => builder.domain_with_reset(
                    &decl.name,
                    decl.clock,
                    decl.edge,
                    reset.signal,
                    reset.polarity,
                ),
                None => builder.domain(&decl.name, decl.clock, decl.edge),
            };
        }
        for rule in self.comb {
            builder.comb(&rule.statement, rule.target, rule.expr);
        }
        for rule in self.registered {
            builder.sync(rule.domain, &rule.statement, rule.target, rule.expr);
        }
        for name in &self.statements {
            builder.statement(name);
        }
        Ok(builder)
    }
}

/// Checks that sorted `(id, name)` pairs number exactly `0..n`.
fn check_dense<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = (u32, &'a str)>,
) -> Result<(), ConfigurationError> {
    let mut prev: Option<u32> = None;
    for (expected, (id, name)) in ids.enumerate() {
        if prev == Some(id) {
            return Err(ConfigurationError::DuplicateId { kind, id });
        }
        if id != expected as u32 {
            return Err(ConfigurationError::MisnumberedId {
                kind,
                name: name.to_string(),
                declared: id,
                expected: expected as u32,
            });
        }
        prev = Some(id);
    }
    Ok(())
}

impl Netlist {
    /// Parses, validates and builds a netlist from its JSON description.
    pub fn from_json(json: &str) -> Result<Netlist, NetlistError> {
        NetlistFile::from_json(json)?.into_builder()?.build()
    }

    /// Reads and builds a netlist from a JSON file.
    pub fn from_path(path: &Path) -> Result<Netlist, NetlistError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
