//! The Strobe netlist: an immutable, arena-addressed description of
//! synchronous hardware.
//!
//! A [`Netlist`] holds [`Signal`]s, combinational rules ([`CombRule`]),
//! clock [`Domain`]s and the registered rules ([`RegisteredRule`]) each
//! domain governs. Every rule is one named [`Statement`]. Netlists are
//! produced by [`NetlistBuilder`] or loaded from JSON via
//! [`Netlist::from_json`]; both paths run the same validation and report
//! undeclared or duplicate references as [`ConfigurationError`].

#![warn(missing_docs)]

pub mod arena;
pub mod builder;
pub mod domain;
pub mod error;
pub mod expr;
pub mod format;
pub mod ids;
pub mod netlist;
pub mod rule;
pub mod signal;
mod validate;

pub use arena::{Arena, ArenaId};
pub use builder::NetlistBuilder;
pub use domain::{Domain, Edge, Polarity, ResetSpec};
pub use error::{ConfigurationError, NetlistError, StructuralError};
pub use expr::{BinaryOp, Expr, MatchArm, ParsePatternError, Pattern, UnaryOp};
pub use format::NetlistFile;
pub use ids::{DomainId, SignalId, StatementId};
pub use netlist::{Driver, Netlist};
pub use rule::{CombRule, RegisteredRule, Statement};
pub use signal::{Signal, SignalSpec};
