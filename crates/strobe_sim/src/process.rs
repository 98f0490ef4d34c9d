//! Cooperative testbench processes.
//!
//! A testbench is an `async` block driven by the simulator's single-threaded
//! scheduler. It talks to the engine only through its [`TestbenchContext`]:
//! reads see committed values, writes are staged in a mailbox, and awaiting
//! one of the wait futures ([`TestbenchContext::wait_tick`],
//! [`TestbenchContext::wait_delay`], [`TestbenchContext::settle`]) posts a
//! request and suspends. The scheduler then flushes the staged writes,
//! settles, processes any implied edges, and re-polls the testbench once the
//! request is satisfied. No OS threads are involved.
//!
//! ```ignore
//! sim.add_testbench("stimulus", move |ctx| async move {
//!     ctx.write_u64(sel, 0b010);
//!     ctx.settle().await;
//!     assert_eq!(ctx.read_u64(out), 0xb);
//!     ctx.wait_tick(sync).await;
//!     Ok(())
//! })?;
//! ```

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::{Arc, Once};
use std::task::{Context, Poll, Wake, Waker};

use strobe_common::BitVec;
use strobe_ir::{DomainId, Driver, Netlist, SignalId, StatementId, StructuralError};
use tracing::debug;

use crate::error::SimError;
use crate::store::SignalStore;
use crate::time::SimTime;

/// What a testbench body returns. Any error aborts the run as a
/// [`ProcessError`](crate::ProcessError).
pub type TestbenchResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) type ProcessFuture = Pin<Box<dyn Future<Output = TestbenchResult>>>;

/// A suspension request posted by an awaited wait future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitRequest {
    /// Resume after the next active edge of the domain has been processed.
    Tick(DomainId),
    /// Resume after the given span of simulated time.
    Delay(SimTime),
    /// Resume once staged writes have settled and implied edges have run.
    Settle,
}

/// Per-process channel between a testbench and the scheduler.
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    pub(crate) hits: Vec<StatementId>,
    pub(crate) writes: Vec<(SignalId, BitVec)>,
    pub(crate) request: Option<WaitRequest>,
    pub(crate) fault: Option<SimError>,
}

/// Engine state visible to testbenches while they run.
pub(crate) struct Shared {
    pub(crate) netlist: Arc<Netlist>,
    pub(crate) store: RefCell<SignalStore>,
    pub(crate) now: Cell<SimTime>,
}

/// A testbench's handle on the running simulation.
///
/// Cloning the context gives another handle on the same process.
#[derive(Clone)]
pub struct TestbenchContext {
    shared: Rc<Shared>,
    mailbox: Rc<RefCell<Mailbox>>,
}

impl TestbenchContext {
    pub(crate) fn new(shared: Rc<Shared>, mailbox: Rc<RefCell<Mailbox>>) -> Self {
        Self { shared, mailbox }
    }

    /// Returns the current simulated time.
    pub fn now(&self) -> SimTime {
        self.shared.now.get()
    }

    /// Returns the netlist being simulated.
    pub fn netlist(&self) -> &Netlist {
        &self.shared.netlist
    }

    /// Looks up a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.shared.netlist.find_signal(name)
    }

    /// Looks up a domain by name.
    pub fn find_domain(&self, name: &str) -> Option<DomainId> {
        self.shared.netlist.find_domain(name)
    }

    /// Looks up a statement by name.
    pub fn find_statement(&self, name: &str) -> Option<StatementId> {
        self.shared.netlist.find_statement(name)
    }

    /// Records one execution of `statement` on behalf of this testbench.
    ///
    /// The hit reaches every observer's
    /// [`on_statement_hit`](crate::Observer::on_statement_hit) when the
    /// testbench next suspends or finishes, before its staged writes are
    /// committed. Testbenches use this for statements declared with
    /// `NetlistBuilder::statement`, which no rule executes.
    pub fn record_statement_hit(&self, statement: StatementId) {
        if self.shared.netlist.statements().contains(statement) {
            self.mailbox.borrow_mut().hits.push(statement);
        } else {
            self.fault(SimError::UnknownStatement(statement.to_string()));
        }
    }

    /// Returns the committed value of `signal`.
    ///
    /// Writes staged by this testbench are not visible until it suspends.
    /// An unknown signal aborts the run at the next suspension point and
    /// reads as a zero-width value.
    pub fn read(&self, signal: SignalId) -> BitVec {
        let store = self.shared.store.borrow();
        if store.contains(signal) {
            store.get(signal).clone()
        } else {
            self.fault(SimError::UnknownSignal(signal.to_string()));
            BitVec::new(0)
        }
    }

    /// Returns the low 64 bits of the committed value of `signal`.
    pub fn read_u64(&self, signal: SignalId) -> u64 {
        self.read(signal).low_u64()
    }

    /// Stages `value` for `signal`; it is committed when this testbench next
    /// suspends or finishes.
    ///
    /// A value with more significant bits than the signal holds is a
    /// [`StructuralError::ValueTooWide`], and writing a signal driven by a
    /// combinational rule is rejected; both abort the run before the value
    /// reaches the store.
    pub fn write(&self, signal: SignalId, value: BitVec) {
        let netlist = &self.shared.netlist;
        let Some(sig) = netlist.signal(signal) else {
            self.fault(SimError::UnknownSignal(signal.to_string()));
            return;
        };
        if let Some(Driver::Comb(_)) = netlist.driver(signal) {
            self.fault(SimError::DrivenSignal {
                signal: netlist.signal_name(signal),
            });
            return;
        }
        if !value.fits_in(sig.width) {
            self.fault(
                StructuralError::ValueTooWide {
                    signal: netlist.signal_name(signal),
                    width: sig.width,
                    value: value.resize(value.significant_bits()).to_string(),
                }
                .into(),
            );
            return;
        }
        self.mailbox
            .borrow_mut()
            .writes
            .push((signal, value.resize(sig.width)));
    }

    /// Stages an integer value for `signal`.
    pub fn write_u64(&self, signal: SignalId, value: u64) {
        self.write(signal, BitVec::from_u64(value, 64));
    }

    /// Suspends until the next active edge of `domain` has been processed
    /// and settled.
    pub fn wait_tick(&self, domain: DomainId) -> Suspend {
        self.suspend(WaitRequest::Tick(domain))
    }

    /// Suspends until `n` active edges of `domain` have been processed.
    pub async fn ticks(&self, domain: DomainId, n: u64) {
        for _ in 0..n {
            self.wait_tick(domain).await;
        }
    }

    /// Suspends for `duration` of simulated time.
    pub fn wait_delay(&self, duration: SimTime) -> Suspend {
        self.suspend(WaitRequest::Delay(duration))
    }

    /// Commits staged writes and suspends until they have settled and any
    /// edges they caused have been processed, without advancing time.
    pub fn settle(&self) -> Suspend {
        self.suspend(WaitRequest::Settle)
    }

    fn suspend(&self, request: WaitRequest) -> Suspend {
        Suspend {
            mailbox: Rc::clone(&self.mailbox),
            request: Some(request),
        }
    }

    fn fault(&self, error: SimError) {
        let mut mailbox = self.mailbox.borrow_mut();
        if mailbox.fault.is_none() {
            mailbox.fault = Some(error);
        }
    }
}

/// Future returned by the testbench wait operations.
///
/// The first poll posts the request and returns `Pending`; the scheduler
/// polls again only once the request has been satisfied.
#[must_use = "simulator waits do nothing unless awaited"]
pub struct Suspend {
    mailbox: Rc<RefCell<Mailbox>>,
    request: Option<WaitRequest>,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.request.take() {
            Some(request) => {
                self.mailbox.borrow_mut().request = Some(request);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

/// The scheduler re-polls processes from its own event queue, so wake-ups
/// carry no information.
struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
    fn wake_by_ref(self: &Arc<Self>) {}
}

pub(crate) fn noop_waker() -> Waker {
    Arc::new(NoopWaker).into()
}

/// Built-in stimulus toggling a domain's clock every half period.
///
/// The clock first toggles at `period / 2`, so a rising-edge domain whose
/// clock starts low sees its first active edge there.
pub(crate) async fn clock_generator(
    ctx: TestbenchContext,
    clock: SignalId,
    period: SimTime,
) -> TestbenchResult {
    let first_half = SimTime::from_fs(period.as_fs() / 2);
    let second_half = period - first_half;
    let mut level = ctx.read(clock).get(0);
    ctx.wait_delay(first_half).await;
    loop {
        level = !level;
        ctx.write(clock, BitVec::from_bool(level));
        let hold = if level { second_half } else { first_half };
        ctx.wait_delay(hold).await;
    }
}

thread_local! {
    static POLLING_TESTBENCH: Cell<bool> = const { Cell::new(false) };
}

static QUIET_PANIC_HOOK: Once = Once::new();

/// Chains a panic hook in front of the current one, once per process.
///
/// Panics raised on a thread that is polling a testbench are logged at
/// debug level instead of reaching the previous hook; the run reports them
/// as a [`ProcessError`](crate::ProcessError). Every other panic goes to the
/// previous hook unchanged. A hook installed later replaces this one.
fn install_quiet_panic_hook() {
    QUIET_PANIC_HOOK.call_once(|| {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if POLLING_TESTBENCH.with(Cell::get) {
                debug!(%info, "testbench panicked");
            } else {
                original_hook(info);
            }
        }));
    });
}

/// Runs `poll` with testbench panics kept off the default panic output.
pub(crate) fn quietly<R>(poll: impl FnOnce() -> R) -> R {
    install_quiet_panic_hook();
    let was_polling = POLLING_TESTBENCH.with(|flag| flag.replace(true));
    let result = poll();
    POLLING_TESTBENCH.with(|flag| flag.set(was_polling));
    result
}

/// Renders a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
