//! The combinational evaluator: drives comb rules to a fixpoint.
//!
//! Each round evaluates every pending rule against the committed values,
//! stages all outputs, then commits them together. Rules reading a signal
//! that changed in the round are pending in the next one. Because all
//! rules of a round see the same snapshot, the fixpoint of an acyclic
//! graph does not depend on rule order.

use std::collections::BTreeSet;

use strobe_ir::{Netlist, SignalId, StructuralError};
use tracing::trace;

use crate::error::{ProcessError, ProcessIdentity, SimError};
use crate::eval::eval_expr;
use crate::observer::{HookContext, Observers};
use crate::store::{Change, SignalStore};
use crate::time::SimTime;

/// Outcome of a completed settle.
#[derive(Debug, Default)]
pub(crate) struct Settled {
    /// Rounds evaluated.
    pub rounds: u32,
    /// Every committed change, in commit order.
    pub changes: Vec<Change>,
}

/// Returns the indices of comb rules reading any of `signals`.
pub(crate) fn rules_reading(
    netlist: &Netlist,
    signals: impl IntoIterator<Item = SignalId>,
) -> BTreeSet<usize> {
    signals
        .into_iter()
        .flat_map(|s| netlist.readers(s).iter().copied())
        .collect()
}

/// Re-evaluates `pending` rules, and everything downstream of their changes,
/// until nothing changes.
///
/// Fails with [`StructuralError::NonConverging`] if values are still
/// changing after `max_iterations` rounds. Rounds committed before a
/// failure stay committed.
pub(crate) fn settle(
    netlist: &Netlist,
    store: &mut SignalStore,
    observers: &mut Observers,
    time: SimTime,
    max_iterations: u32,
    mut pending: BTreeSet<usize>,
) -> Result<Settled, SimError> {
    let ctx = HookContext { time, netlist };
    let mut settled = Settled::default();
    let mut last_changed: Vec<SignalId> = Vec::new();

    while !pending.is_empty() {
        if settled.rounds >= max_iterations {
            last_changed.sort_unstable();
            return Err(StructuralError::NonConverging {
                iterations: max_iterations,
                signals: last_changed.iter().map(|&s| netlist.signal_name(s)).collect(),
            }
            .into());
        }
        settled.rounds += 1;

        let mut targets = Vec::with_capacity(pending.len());
        for &index in &pending {
            let rule = &netlist.comb_rules()[index];
            let value = eval_expr(store, &rule.expr).map_err(|e| ProcessError {
                process: ProcessIdentity::Combinational {
                    statement: netlist.statement_name(rule.statement),
                },
                time,
                message: e.to_string(),
            })?;
            observers.statement_hit(&ctx, rule.statement);
            store.stage(rule.target, value);
            targets.push(rule.target);
        }

        let changes = store.commit(&targets);
        observers.committed(&ctx, &changes);
        trace!(
            round = settled.rounds,
            evaluated = targets.len(),
            changed = changes.len(),
            "settle round"
        );

        last_changed = changes.iter().map(|c| c.signal).collect();
        pending = rules_reading(netlist, last_changed.iter().copied());
        settled.changes.extend(changes);
    }

    Ok(settled)
}
