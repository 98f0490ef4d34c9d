//! The clock domain scheduler: edge detection and atomic registered commits.

use strobe_common::BitVec;
use strobe_ir::{DomainId, Netlist, SignalId};

use crate::error::{ProcessError, ProcessIdentity, SimError};
use crate::eval::eval_expr;
use crate::observer::{HookContext, Observers};
use crate::store::{Change, SignalStore};
use crate::time::SimTime;

/// Returns the domains whose clock took its active edge in `changes`, in
/// commit order. A domain appears once per edge.
pub(crate) fn active_edges(netlist: &Netlist, changes: &[Change]) -> Vec<DomainId> {
    let mut edges = Vec::new();
    for change in changes {
        for &id in netlist.clocked_domains(change.signal) {
            let Some(domain) = netlist.domain(id) else {
                continue;
            };
            if domain.edge.matches(change.old.get(0), change.new.get(0)) {
                edges.push(id);
            }
        }
    }
    edges
}

/// Runs the registered-update step of `domains`.
///
/// Every registered rule of every listed domain is evaluated against the
/// pre-edge committed values. Signals of a domain whose reset is asserted
/// take their declared reset value instead; reset-less signals keep the
/// computed one. All results are then staged and committed as one batch,
/// so no rule observes another's post-edge value. On an evaluation fault
/// nothing is committed.
pub(crate) fn registered_step(
    netlist: &Netlist,
    store: &mut SignalStore,
    observers: &mut Observers,
    time: SimTime,
    domains: &[DomainId],
) -> Result<Vec<Change>, SimError> {
    let ctx = HookContext { time, netlist };
    let mut next: Vec<(SignalId, BitVec)> = Vec::new();

    for &id in domains {
        let Some(domain) = netlist.domain(id) else {
            continue;
        };
        let in_reset = domain
            .reset
            .is_some_and(|r| r.polarity.is_asserted(store.get(r.signal).get(0)));

        for rule in netlist.domain_rules(id) {
            let computed = eval_expr(store, &rule.expr).map_err(|e| ProcessError {
                process: ProcessIdentity::Registered {
                    statement: netlist.statement_name(rule.statement),
                    domain: netlist.name(domain.name).to_string(),
                },
                time,
                message: e.to_string(),
            })?;
            observers.statement_hit(&ctx, rule.statement);
            let value = match netlist.signal(rule.target).and_then(|s| s.reset.as_ref()) {
                Some(reset) if in_reset => reset.clone(),
                _ => computed,
            };
            next.push((rule.target, value));
        }
    }

    let targets: Vec<SignalId> = next.iter().map(|(s, _)| *s).collect();
    for (signal, value) in next {
        store.stage(signal, value);
    }
    let changes = store.commit(&targets);
    observers.committed(&ctx, &changes);
    Ok(changes)
}
