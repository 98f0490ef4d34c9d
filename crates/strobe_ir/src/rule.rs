//! Signal-update rules and the statements that identify them.

use crate::expr::Expr;
use crate::ids::{DomainId, SignalId, StatementId};
use strobe_common::Ident;

/// A named statement. Every rule is exactly one statement, so statement
/// coverage counts rule executions; statements without a rule count only
/// the hits testbenches record.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Index of this statement.
    pub id: StatementId,
    /// Interned statement name.
    pub name: Ident,
}

/// A combinational rule: `target` continuously follows `expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct CombRule {
    /// The statement this rule implements.
    pub statement: StatementId,
    /// The driven signal.
    pub target: SignalId,
    /// The driving expression.
    pub expr: Expr,
    /// Sorted, de-duplicated signals read by `expr`.
    pub reads: Vec<SignalId>,
}

/// A registered rule: at each active edge of `domain`, `target` takes the
/// pre-edge value of `expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredRule {
    /// The statement this rule implements.
    pub statement: StatementId,
    /// The governing clock domain.
    pub domain: DomainId,
    /// The registered signal.
    pub target: SignalId,
    /// The next-state expression.
    pub expr: Expr,
}
