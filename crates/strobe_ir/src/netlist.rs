//! The immutable netlist value handed to the simulator.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::arena::Arena;
use crate::domain::Domain;
use crate::ids::{DomainId, SignalId, StatementId};
use crate::rule::{CombRule, RegisteredRule, Statement};
use crate::signal::Signal;
use strobe_common::{Ident, Interner};

/// Which rule, if any, drives a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Driven by the combinational rule at this index of [`Netlist::comb_rules`].
    Comb(usize),
    /// Driven by the registered rule at this index of [`Netlist::registered_rules`].
    Registered(usize),
}

/// A validated, self-contained netlist addressed by index.
///
/// Built once by [`NetlistBuilder`](crate::NetlistBuilder) or
/// [`Netlist::from_json`](crate::Netlist::from_json) and never mutated
/// afterwards. All IDs are dense indices into the arenas held here.
#[derive(Debug)]
pub struct Netlist {
    pub(crate) names: Interner,
    pub(crate) signals: Arena<SignalId, Signal>,
    pub(crate) statements: Arena<StatementId, Statement>,
    pub(crate) comb: Vec<CombRule>,
    pub(crate) domains: Arena<DomainId, Domain>,
    pub(crate) registered: Vec<RegisteredRule>,
    /// Per signal: indices of comb rules that read it.
    pub(crate) readers: Vec<Vec<usize>>,
    /// Per signal: the rule driving it.
    pub(crate) drivers: Vec<Option<Driver>>,
    /// Per domain: indices of its registered rules, in declaration order.
    pub(crate) domain_rules: Vec<Vec<usize>>,
    /// Per signal: domains clocked by it.
    pub(crate) clocked: Vec<Vec<DomainId>>,
}

impl Netlist {
    /// Returns the name interner.
    pub fn interner(&self) -> &Interner {
        &self.names
    }

    /// Resolves an interned name.
    pub fn name(&self, ident: Ident) -> &str {
        self.names.resolve(ident)
    }

    /// Returns all signals in ID order.
    pub fn signals(&self) -> &Arena<SignalId, Signal> {
        &self.signals
    }

    /// Returns a signal by ID.
    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals.get(id)
    }

    /// Returns the name of a signal, or its ID rendering if unknown.
    pub fn signal_name(&self, id: SignalId) -> String {
        match self.signals.get(id) {
            Some(sig) => self.names.resolve(sig.name).to_string(),
            None => id.to_string(),
        }
    }

    /// Looks up a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        let ident = self.names.get(name)?;
        self.signals
            .iter()
            .find(|(_, sig)| sig.name == ident)
            .map(|(id, _)| id)
    }

    /// Returns all statements in ID order.
    pub fn statements(&self) -> &Arena<StatementId, Statement> {
        &self.statements
    }

    /// Returns the name of a statement, or its ID rendering if unknown.
    pub fn statement_name(&self, id: StatementId) -> String {
        match self.statements.get(id) {
            Some(stmt) => self.names.resolve(stmt.name).to_string(),
            None => id.to_string(),
        }
    }

    /// Looks up a statement by name.
    pub fn find_statement(&self, name: &str) -> Option<StatementId> {
        let ident = self.names.get(name)?;
        self.statements
            .iter()
            .find(|(_, stmt)| stmt.name == ident)
            .map(|(id, _)| id)
    }

    /// Returns all clock domains in ID order.
    pub fn domains(&self) -> &Arena<DomainId, Domain> {
        &self.domains
    }

    /// Returns a domain by ID.
    pub fn domain(&self, id: DomainId) -> Option<&Domain> {
        self.domains.get(id)
    }

    /// Looks up a domain by name.
    pub fn find_domain(&self, name: &str) -> Option<DomainId> {
        let ident = self.names.get(name)?;
        self.domains
            .iter()
            .find(|(_, dom)| dom.name == ident)
            .map(|(id, _)| id)
    }

    /// Returns the name of a domain, or its ID rendering if unknown.
    pub fn domain_name(&self, id: DomainId) -> String {
        match self.domains.get(id) {
            Some(dom) => self.names.resolve(dom.name).to_string(),
            None => id.to_string(),
        }
    }

    /// Returns the combinational rules.
    pub fn comb_rules(&self) -> &[CombRule] {
        &self.comb
    }

    /// Returns every registered rule, across all domains.
    pub fn registered_rules(&self) -> &[RegisteredRule] {
        &self.registered
    }

    /// Iterates over the registered rules governed by `domain`.
    pub fn domain_rules(&self, domain: DomainId) -> impl Iterator<Item = &RegisteredRule> + '_ {
        self.domain_rules
            .get(domain.index())
            .into_iter()
            .flatten()
            .map(|&i| &self.registered[i])
    }

    /// Returns indices into [`comb_rules`](Self::comb_rules) of the rules reading `signal`.
    pub fn readers(&self, signal: SignalId) -> &[usize] {
        self.readers
            .get(signal.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the rule driving `signal`, or `None` for free inputs.
    pub fn driver(&self, signal: SignalId) -> Option<Driver> {
        self.drivers.get(signal.index()).copied().flatten()
    }

    /// Returns the domains whose clock is `signal`.
    pub fn clocked_domains(&self, signal: SignalId) -> &[DomainId] {
        self.clocked
            .get(signal.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Finds combinational feedback cycles not broken by a register.
    ///
    /// Returns each cycle as the names of the signals on it, sorted by
    /// signal ID. An empty result means the combinational graph is acyclic.
    pub fn combinational_loops(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<SignalId, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = self.signals.ids().map(|id| graph.add_node(id)).collect();
        for rule in &self.comb {
            for read in &rule.reads {
                graph.add_edge(nodes[read.index()], nodes[rule.target.index()], ());
            }
        }

        let mut loops: Vec<Vec<SignalId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<SignalId> = scc.into_iter().map(|n| graph[n]).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        loops.sort();
        loops
            .into_iter()
            .map(|ids| ids.into_iter().map(|id| self.signal_name(id)).collect())
            .collect()
    }
}
