//! Side-channel instrumentation hooks.
//!
//! Observers are attached to a [`Simulator`](crate::Simulator) before it
//! runs and are called synchronously, in-line, at two hook points: every
//! dynamic rule execution or testbench-recorded statement hit
//! ([`Observer::on_statement_hit`]) and every
//! single-bit change at a commit ([`Observer::on_signal_transition`]).
//! Hooks receive read-only context and cannot feed back into simulation
//! state, so attaching observers never changes results.

use std::any::Any;
use std::marker::PhantomData;

use strobe_ir::{Netlist, SignalId, StatementId};

use crate::store::Change;
use crate::time::SimTime;

/// Read-only context passed to every hook.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    /// Simulated time of the hook.
    pub time: SimTime,
    /// The netlist being simulated.
    pub netlist: &'a Netlist,
}

/// A single-bit change observed at a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    /// The signal that changed.
    pub signal: SignalId,
    /// Bit index within the signal (0 = LSB).
    pub bit: u32,
    /// Bit value before the commit.
    pub old: bool,
    /// Bit value after the commit.
    pub new: bool,
}

/// Upcasting to [`Any`], so attached observers can be handed back by type.
pub trait AsAny {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Instrumentation attached to a simulation run.
///
/// Both hooks default to doing nothing.
pub trait Observer: AsAny + 'static {
    /// Called once per dynamic execution of a combinational or registered
    /// rule, and once per hit a testbench records.
    fn on_statement_hit(&mut self, _ctx: &HookContext<'_>, _statement: StatementId) {}

    /// Called once per changed bit at a commit boundary.
    fn on_signal_transition(&mut self, _ctx: &HookContext<'_>, _transition: &Transition) {}
}

/// Typed handle to an attached observer.
pub struct ObserverHandle<O> {
    index: usize,
    _marker: PhantomData<fn() -> O>,
}

impl<O> Clone for ObserverHandle<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for ObserverHandle<O> {}

impl<O> std::fmt::Debug for ObserverHandle<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObserverHandle({})", self.index)
    }
}

/// The attached observers, in attach order.
#[derive(Default)]
pub(crate) struct Observers {
    list: Vec<Box<dyn Observer>>,
}

impl Observers {
    pub(crate) fn attach<O: Observer>(&mut self, observer: O) -> ObserverHandle<O> {
        self.list.push(Box::new(observer));
        ObserverHandle {
            index: self.list.len() - 1,
            _marker: PhantomData,
        }
    }

    pub(crate) fn get<O: Observer>(&self, handle: ObserverHandle<O>) -> Option<&O> {
        let observer: &dyn Observer = self.list.get(handle.index)?.as_ref();
        observer.as_any().downcast_ref::<O>()
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    pub(crate) fn statement_hit(&mut self, ctx: &HookContext<'_>, statement: StatementId) {
        for observer in &mut self.list {
            observer.on_statement_hit(ctx, statement);
        }
    }

    /// Fans committed changes out into per-bit transitions.
    pub(crate) fn committed(&mut self, ctx: &HookContext<'_>, changes: &[Change]) {
        if self.list.is_empty() {
            return;
        }
        for change in changes {
            for bit in change.old.changed_bits(&change.new) {
                let transition = Transition {
                    signal: change.signal,
                    bit,
                    old: change.old.get(bit),
                    new: change.new.get(bit),
                };
                for observer in &mut self.list {
                    observer.on_signal_transition(ctx, &transition);
                }
            }
        }
    }
}
