//! Incremental construction of a [`Netlist`].

use crate::domain::{Edge, Polarity, ResetSpec};
use crate::error::NetlistError;
use crate::expr::Expr;
use crate::ids::{DomainId, SignalId, StatementId};
use crate::netlist::Netlist;
use crate::signal::SignalSpec;
use crate::validate;

/// A clock domain as declared, before validation.
#[derive(Debug, Clone)]
pub(crate) struct DomainDecl {
    pub(crate) name: String,
    pub(crate) clock: SignalId,
    pub(crate) edge: Edge,
    pub(crate) reset: Option<ResetSpec>,
}

/// A rule as declared, before validation. `domain` is `None` for
/// combinational rules.
#[derive(Debug, Clone)]
pub(crate) struct RuleDecl {
    pub(crate) statement: StatementId,
    pub(crate) domain: Option<DomainId>,
    pub(crate) target: SignalId,
    pub(crate) expr: Expr,
}

/// Collects signals, domains and rules, then validates them into a [`Netlist`].
///
/// IDs are handed out in declaration order. Nothing is checked until
/// [`build`](Self::build), so a rule may reference an ID that is declared
/// later, and an ID that never gets declared is reported there as a
/// [`ConfigurationError`](crate::ConfigurationError).
///
/// ```
/// use strobe_ir::{BinaryOp, Edge, Expr, NetlistBuilder, SignalSpec};
///
/// let mut b = NetlistBuilder::new();
/// let clk = b.add_signal(SignalSpec::new("clk", 1));
/// let count = b.add_signal(SignalSpec::new("count", 2));
/// let sync = b.domain("sync", clk, Edge::Posedge);
/// b.sync(
///     sync,
///     "count_next",
///     count,
///     Expr::binary(BinaryOp::Add, Expr::signal(count), Expr::constant(1, 2)),
/// );
/// let netlist = b.build().unwrap();
/// assert_eq!(netlist.signals().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct NetlistBuilder {
    pub(crate) signals: Vec<SignalSpec>,
    pub(crate) statements: Vec<String>,
    pub(crate) domains: Vec<DomainDecl>,
    pub(crate) rules: Vec<RuleDecl>,
}

impl NetlistBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a signal and returns its ID.
    pub fn add_signal(&mut self, spec: SignalSpec) -> SignalId {
        let id = SignalId::from_raw(self.signals.len() as u32);
        self.signals.push(spec);
        id
    }

    /// Declares a combinational rule `target = expr` under the statement name `statement`.
    pub fn comb(&mut self, statement: &str, target: SignalId, expr: Expr) -> StatementId {
        self.rule(statement, None, target, expr)
    }

    /// Declares a clock domain with no reset.
    pub fn domain(&mut self, name: &str, clock: SignalId, edge: Edge) -> DomainId {
        self.push_domain(name, clock, edge, None)
    }

    /// Declares a clock domain with a synchronous reset input.
    pub fn domain_with_reset(
        &mut self,
        name: &str,
        clock: SignalId,
        edge: Edge,
        reset: SignalId,
        polarity: Polarity,
    ) -> DomainId {
        let reset = ResetSpec {
            signal: reset,
            polarity,
        };
        self.push_domain(name, clock, edge, Some(reset))
    }

    /// Declares a registered rule: at each active edge of `domain`,
    /// `target` takes the pre-edge value of `expr`.
    pub fn sync(
        &mut self,
        domain: DomainId,
        statement: &str,
        target: SignalId,
        expr: Expr,
    ) -> StatementId {
        self.rule(statement, Some(domain), target, expr)
    }

    /// Validates everything declared so far and produces the netlist.
    pub fn build(self) -> Result<Netlist, NetlistError> {
        Ok(validate::assemble(self)?)
    }

    fn push_domain(
        &mut self,
        name: &str,
        clock: SignalId,
        edge: Edge,
        reset: Option<ResetSpec>,
    ) -> DomainId {
        let id = DomainId::from_raw(self.domains.len() as u32);
        self.domains.push(DomainDecl {
            name: name.to_string(),
            clock,
            edge,
            reset,
        });
        id
    }

    /// Declares a statement that no rule implements.
    ///
    /// Such a statement only collects hits that testbenches record
    /// explicitly, so statement coverage can track branches of testbench
    /// logic alongside the netlist's own rules.
    pub fn statement(&mut self, name: &str) -> StatementId {
        let id = StatementId::from_raw(self.statements.len() as u32);
        self.statements.push(name.to_string());
        id
    }

    fn rule(
        &mut self,
        statement: &str,
        domain: Option<DomainId>,
        target: SignalId,
        expr: Expr,
    ) -> StatementId {
        let id = self.statement(statement);
        self.rules.push(RuleDecl {
            statement: id,
            domain,
            target,
            expr,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;
    use crate::expr::BinaryOp;

    fn config_err(result: Result<Netlist, NetlistError>) -> ConfigurationError {
        match result {
            Err(NetlistError::Configuration(e)) => e,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn ids_follow_declaration_order() {
        let mut b = NetlistBuilder::new();
        let a = b.add_signal(SignalSpec::new("a", 1));
        let y = b.add_signal(SignalSpec::new("y", 1));
        let s0 = b.comb("first", y, Expr::signal(a));
        assert_eq!(a.as_raw(), 0);
        assert_eq!(y.as_raw(), 1);
        assert_eq!(s0.as_raw(), 0);
        let n = b.build().unwrap();
        assert_eq!(n.statements().len(), 1);
        assert_eq!(n.comb_rules()[0].reads, vec![a]);
    }

    #[test]
    fn forward_references_resolve() {
        let mut b = NetlistBuilder::new();
        let y = SignalId::from_raw(1);
        let a = b.add_signal(SignalSpec::new("a", 2));
        b.comb("y_eq", y, Expr::signal(a));
        b.add_signal(SignalSpec::new("y", 2));
        assert!(b.build().is_ok());
    }

    #[test]
    fn undeclared_signal_in_expression() {
        let mut b = NetlistBuilder::new();
        let y = b.add_signal(SignalSpec::new("y", 1));
        b.comb("y_eq", y, Expr::signal(SignalId::from_raw(9)));
        let err = config_err(b.build());
        assert_eq!(
            err,
            ConfigurationError::UnknownSignal {
                context: "statement 'y_eq'".into(),
                id: 9
            }
        );
    }

    #[test]
    fn undeclared_domain() {
        let mut b = NetlistBuilder::new();
        let q = b.add_signal(SignalSpec::new("q", 1));
        b.sync(DomainId::from_raw(3), "q_eq", q, Expr::constant(1, 1));
        let err = config_err(b.build());
        assert!(matches!(err, ConfigurationError::UnknownDomain { id: 3, .. }));
    }

    #[test]
    fn undeclared_clock() {
        let mut b = NetlistBuilder::new();
        b.domain("sync", SignalId::from_raw(0), Edge::Posedge);
        let err = config_err(b.build());
        assert!(matches!(err, ConfigurationError::UnknownSignal { id: 0, .. }));
    }

    #[test]
    fn reset_value_is_normalized() {
        let mut b = NetlistBuilder::new();
        let q = b.add_signal(SignalSpec::new("q", 4).init(5).reset(2));
        let n = b.build().unwrap();
        let sig = n.signal(q).unwrap();
        assert_eq!(sig.init.width(), 4);
        assert_eq!(sig.init.to_u64(), Some(5));
        assert_eq!(sig.reset.as_ref().and_then(|r| r.to_u64()), Some(2));
    }

    #[test]
    fn duplicate_driver_across_kinds() {
        let mut b = NetlistBuilder::new();
        let clk = b.add_signal(SignalSpec::new("clk", 1));
        let q = b.add_signal(SignalSpec::new("q", 2));
        let sync = b.domain("sync", clk, Edge::Posedge);
        b.sync(sync, "q_next", q, Expr::constant(1, 2));
        b.comb("q_comb", q, Expr::binary(BinaryOp::And, Expr::signal(clk), Expr::signal(clk)));
        let err = config_err(b.build());
        assert_eq!(err, ConfigurationError::MultipleDrivers { signal: "q".into() });
    }

    #[test]
    fn marker_statements_share_the_statement_arena() {
        let mut b = NetlistBuilder::new();
        let a = b.add_signal(SignalSpec::new("a", 1));
        let y = b.add_signal(SignalSpec::new("y", 1));
        let taken = b.statement("branch_taken");
        let rule = b.comb("y_eq", y, Expr::signal(a));
        assert_eq!((taken.as_raw(), rule.as_raw()), (0, 1));
        let n = b.build().unwrap();
        assert_eq!(n.statements().len(), 2);
        assert_eq!(n.comb_rules().len(), 1);
        assert_eq!(n.find_statement("branch_taken"), Some(taken));

        let mut b = NetlistBuilder::new();
        b.statement("twice");
        b.statement("twice");
        assert!(matches!(
            config_err(b.build()),
            ConfigurationError::DuplicateName { kind: "statement", .. }
        ));
    }
}
