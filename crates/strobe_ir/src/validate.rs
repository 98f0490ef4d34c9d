//! Load-time validation turning builder declarations into a [`Netlist`].
//!
//! Every reference is resolved and every width fixed here, so the
//! simulator can index arenas directly without re-checking.

use std::collections::HashSet;

use crate::arena::Arena;
use crate::builder::NetlistBuilder;
use crate::domain::Domain;
use crate::error::ConfigurationError;
use crate::expr::Expr;
use crate::ids::{DomainId, SignalId, StatementId};
use crate::netlist::{Driver, Netlist};
use crate::rule::{CombRule, RegisteredRule, Statement};
use crate::signal::Signal;
use strobe_common::{BitVec, Interner};

pub(crate) fn assemble(builder: NetlistBuilder) -> Result<Netlist, ConfigurationError> {
    let names = Interner::new();

    let mut signals: Arena<SignalId, Signal> = Arena::new();
    let mut seen = HashSet::new();
    for spec in builder.signals {
        if spec.width == 0 {
            return Err(ConfigurationError::ZeroWidth { signal: spec.name });
        }
        if !seen.insert(spec.name.clone()) {
            return Err(ConfigurationError::DuplicateName {
                kind: "signal",
                name: spec.name,
            });
        }
        let init = fit_value("initial", &spec.name, &spec.init, spec.width)?;
        let reset = match &spec.reset {
            Some(r) => Some(fit_value("reset", &spec.name, r, spec.width)?),
            None => None,
        };
        let id = signals.next_id();
        signals.alloc(Signal {
            id,
            name: names.get_or_intern(&spec.name),
            width: spec.width,
            init,
            reset,
        });
    }
    let widths: Vec<u32> = signals.values().map(|s| s.width).collect();
    let signal_name = |id: SignalId| names.resolve(signals[id].name).to_string();

    let mut domains: Arena<DomainId, Domain> = Arena::new();
    let mut seen = HashSet::new();
    for decl in builder.domains {
        if !seen.insert(decl.name.clone()) {
            return Err(ConfigurationError::DuplicateName {
                kind: "domain",
                name: decl.name,
            });
        }
        single_bit(&widths, &decl.name, "clock", decl.clock, &signal_name)?;
        if let Some(reset) = &decl.reset {
            single_bit(&widths, &decl.name, "reset", reset.signal, &signal_name)?;
        }
        let id = domains.next_id();
        domains.alloc(Domain {
            id,
            name: names.get_or_intern(&decl.name),
            clock: decl.clock,
            edge: decl.edge,
            reset: decl.reset,
        });
    }

    let mut statements: Arena<StatementId, Statement> = Arena::new();
    let mut seen = HashSet::new();
    for name in &builder.statements {
        if !seen.insert(name.as_str()) {
            return Err(ConfigurationError::DuplicateName {
                kind: "statement",
                name: name.clone(),
            });
        }
        let id = statements.next_id();
        statements.alloc(Statement {
            id,
            name: names.get_or_intern(name),
        });
    }

    let mut comb = Vec::new();
    let mut registered = Vec::new();
    let mut drivers: Vec<Option<Driver>> = vec![None; widths.len()];
    for mut rule in builder.rules {
        let statement = &builder.statements[rule.statement.index()];
        let context = format!("statement '{statement}'");
        if !signals.contains(rule.target) {
            return Err(ConfigurationError::UnknownSignal {
                context,
                id: rule.target.as_raw(),
            });
        }
        ExprCheck {
            widths: &widths,
            statement,
        }
        .check(&mut rule.expr)?;

        let driver = match rule.domain {
            None => Driver::Comb(comb.len()),
            Some(domain) => {
                if !domains.contains(domain) {
                    return Err(ConfigurationError::UnknownDomain {
                        context,
                        id: domain.as_raw(),
                    });
                }
                Driver::Registered(registered.len())
            }
        };
        let slot = &mut drivers[rule.target.index()];
        if slot.is_some() {
            return Err(ConfigurationError::MultipleDrivers {
                signal: signal_name(rule.target),
            });
        }
        *slot = Some(driver);

        match rule.domain {
            None => comb.push(CombRule {
                statement: rule.statement,
                target: rule.target,
                reads: rule.expr.read_set(),
                expr: rule.expr,
            }),
            Some(domain) => registered.push(RegisteredRule {
                statement: rule.statement,
                domain,
                target: rule.target,
                expr: rule.expr,
            }),
        }
    }

    let mut readers = vec![Vec::new(); widths.len()];
    for (i, rule) in comb.iter().enumerate() {
        for read in &rule.reads {
            readers[read.index()].push(i);
        }
    }
    let mut domain_rules = vec![Vec::new(); domains.len()];
    for (i, rule) in registered.iter().enumerate() {
        domain_rules[rule.domain.index()].push(i);
    }
    let mut clocked = vec![Vec::new(); widths.len()];
    for (id, domain) in domains.iter() {
        clocked[domain.clock.index()].push(id);
    }

    Ok(Netlist {
        names,
        signals,
        statements,
        comb,
        domains,
        registered,
        readers,
        drivers,
        domain_rules,
        clocked,
    })
}

fn fit_value(
    which: &'static str,
    signal: &str,
    value: &BitVec,
    width: u32,
) -> Result<BitVec, ConfigurationError> {
    if value.fits_in(width) {
        Ok(value.resize(width))
    } else {
        Err(ConfigurationError::ValueOutOfRange {
            which,
            signal: signal.to_string(),
            value_width: value.significant_bits(),
            width,
        })
    }
}

fn single_bit(
    widths: &[u32],
    domain: &str,
    role: &'static str,
    signal: SignalId,
    signal_name: &impl Fn(SignalId) -> String,
) -> Result<(), ConfigurationError> {
    match widths.get(signal.index()) {
        None => Err(ConfigurationError::UnknownSignal {
            context: format!("{role} of domain '{domain}'"),
            id: signal.as_raw(),
        }),
        Some(&1) => Ok(()),
        Some(&width) => Err(ConfigurationError::NotSingleBit {
            role,
            domain: domain.to_string(),
            signal: signal_name(signal),
            width,
        }),
    }
}

/// Resolves signal references and checks slices and patterns, returning
/// the expression's width.
///
/// Selection branches narrower than their selection are zero-extended in
/// place, so every branch of a validated mux or match already has the
/// result width.
struct ExprCheck<'a> {
    widths: &'a [u32],
    statement: &'a str,
}

impl ExprCheck<'_> {
    fn check(&self, expr: &mut Expr) -> Result<u32, ConfigurationError> {
        let operands = expr
            .operands_mut()
            .into_iter()
            .map(|e| self.check(e))
            .collect::<Result<Vec<_>, _>>()?;

        match &*expr {
            Expr::Signal(id) if id.index() >= self.widths.len() => {
                return Err(ConfigurationError::UnknownSignal {
                    context: format!("statement '{}'", self.statement),
                    id: id.as_raw(),
                });
            }
            Expr::Slice { high, low, .. } => {
                let width = operands.first().copied().unwrap_or(0);
                if low > high || *high >= width {
                    return Err(ConfigurationError::InvalidSlice {
                        statement: self.statement.to_string(),
                        high: *high,
                        low: *low,
                        width,
                    });
                }
            }
            Expr::Match { arms, .. } => {
                let subject_width = operands.first().copied().unwrap_or(0);
                for pattern in arms.iter().flat_map(|arm| &arm.patterns) {
                    if pattern.width() != subject_width {
                        return Err(ConfigurationError::PatternWidth {
                            statement: self.statement.to_string(),
                            pattern: pattern.to_string(),
                            pattern_width: pattern.width(),
                            subject_width,
                        });
                    }
                }
            }
            _ => {}
        }

        let width = expr
            .node_width(&|id| self.widths.get(id.index()).copied(), &operands)
            .unwrap_or(0);
        widen_branches(expr, &operands, width);
        Ok(width)
    }
}

/// Pads every branch of a mux or match to `width` with leading zeros.
fn widen_branches(expr: &mut Expr, operands: &[u32], width: u32) {
    if !matches!(expr, Expr::Mux { .. } | Expr::Match { .. }) {
        return;
    }
    // Operand 0 is the selector or subject; the rest are branches.
    let branches = expr.operands_mut().into_iter().skip(1);
    for (branch, &branch_width) in branches.zip(operands.iter().skip(1)) {
        if branch_width < width {
            let inner = std::mem::replace(branch, Expr::Concat(Vec::new()));
            *branch = Expr::Concat(vec![Expr::Const(BitVec::zero(width - branch_width)), inner]);
        }
    }
}
