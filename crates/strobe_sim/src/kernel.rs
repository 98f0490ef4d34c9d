//! The simulation kernel: event loop, process scheduling, and run control.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::Serialize;
use strobe_common::BitVec;
use strobe_ir::{DomainId, Driver, Netlist, SignalId, StructuralError};
use tracing::{debug, info, warn};

use crate::domain::{active_edges, registered_step};
use crate::error::{ProcessError, ProcessIdentity, SimError};
use crate::observer::{HookContext, Observer, ObserverHandle, Observers};
use crate::process::{
    clock_generator, noop_waker, panic_message, quietly, Mailbox, ProcessFuture, Shared,
    TestbenchContext, TestbenchResult, WaitRequest,
};
use crate::queue::{EventKind, EventQueue, ProcessId};
use crate::settle::{rules_reading, settle};
use crate::store::{Change, SignalStore};
use crate::time::SimTime;
use crate::SimConfig;

/// Why a run returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every testbench finished, or nothing was left to do.
    Completed,
    /// The cycle limit was reached.
    CycleLimit,
    /// The time limit was reached.
    TimeLimit,
    /// The run was cancelled through a [`CancelToken`].
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StopReason::Completed => "completed",
            StopReason::CycleLimit => "cycle limit reached",
            StopReason::TimeLimit => "time limit reached",
            StopReason::Cancelled => "cancelled",
        })
    }
}

/// The result of a completed simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimResult {
    /// Simulated time when the run ended.
    pub final_time: SimTime,
    /// Registered-update steps executed. Edges of several domains falling
    /// at the same instant count as one cycle.
    pub cycles: u64,
    /// Active domain edges processed.
    pub edges: u64,
    /// Combinational settles that evaluated at least one rule.
    pub settles: u64,
    /// Why the run ended.
    pub stop_reason: StopReason,
}

/// Requests cancellation of a run from outside the simulator.
///
/// The run stops at the next step boundary with
/// [`StopReason::Cancelled`]; the store keeps every committed value.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Asks the run to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A registered process: a testbench or a clock generator.
struct ProcessSlot {
    name: String,
    /// Background processes do not keep the run alive.
    background: bool,
    future: Option<ProcessFuture>,
    mailbox: Rc<RefCell<Mailbox>>,
}

#[derive(Debug, Default)]
struct RunStats {
    cycles: u64,
    edges: u64,
    settles: u64,
}

/// The simulation engine.
///
/// Construct via [`Simulator::new`], register testbenches, clock generators
/// and observers, then call [`run`](Simulator::run) once. Committed signal
/// values and observer results stay queryable after the run, including
/// after an aborted one.
pub struct Simulator {
    netlist: Arc<Netlist>,
    config: SimConfig,
    shared: Rc<Shared>,
    queue: EventQueue,
    observers: Observers,
    processes: Vec<ProcessSlot>,
    /// Processes waiting for the next edge, indexed by domain.
    tick_waiters: Vec<Vec<ProcessId>>,
    /// Domains whose clock has a generator.
    clocked: BTreeSet<DomainId>,
    cancel: CancelToken,
    started: bool,
    stats: RunStats,
}

impl Simulator {
    /// Creates a simulator for `netlist`.
    ///
    /// With [`SimConfig::static_loop_check`] set, a netlist whose
    /// combinational rules form a cycle is rejected here with
    /// [`StructuralError::CombinationalLoop`].
    pub fn new(netlist: impl Into<Arc<Netlist>>, config: SimConfig) -> Result<Self, SimError> {
        let netlist = netlist.into();
        if config.static_loop_check {
            if let Some(signals) = netlist.combinational_loops().into_iter().next() {
                return Err(StructuralError::CombinationalLoop { signals }.into());
            }
        }
        let store = SignalStore::new(&netlist);
        let domains = netlist.domains().len();
        debug!(
            signals = store.len(),
            comb_rules = netlist.comb_rules().len(),
            registered_rules = netlist.registered_rules().len(),
            domains,
            "simulator created"
        );
        Ok(Self {
            shared: Rc::new(Shared {
                netlist: Arc::clone(&netlist),
                store: RefCell::new(store),
                now: Cell::new(SimTime::ZERO),
            }),
            netlist,
            config,
            queue: EventQueue::new(),
            observers: Observers::default(),
            processes: Vec::new(),
            tick_waiters: vec![Vec::new(); domains],
            clocked: BTreeSet::new(),
            cancel: CancelToken::default(),
            started: false,
            stats: RunStats::default(),
        })
    }

    /// Returns the netlist being simulated.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Returns the current simulated time.
    pub fn now(&self) -> SimTime {
        self.shared.now.get()
    }

    /// Returns the committed value of `signal`.
    pub fn signal_value(&self, signal: SignalId) -> Option<BitVec> {
        let store = self.shared.store.borrow();
        store.contains(signal).then(|| store.get(signal).clone())
    }

    /// Looks up a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.netlist.find_signal(name)
    }

    /// Looks up a domain by name.
    pub fn find_domain(&self, name: &str) -> Option<DomainId> {
        self.netlist.find_domain(name)
    }

    /// Returns a token that cancels the run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Registers a testbench.
    ///
    /// `body` receives the testbench's [`TestbenchContext`] and returns the
    /// future to drive. Testbenches start at time zero in registration
    /// order, after the initial settle. The run completes once every
    /// testbench has returned.
    pub fn add_testbench<F, Fut>(&mut self, name: &str, body: F) -> Result<ProcessId, SimError>
    where
        F: FnOnce(TestbenchContext) -> Fut,
        Fut: Future<Output = TestbenchResult> + 'static,
    {
        if self.started {
            return Err(SimError::AlreadyStarted { what: "testbenches" });
        }
        Ok(self.spawn(name.to_string(), false, body))
    }

    /// Drives the clock of `domain` with a square wave of `period`.
    ///
    /// The clock first toggles at half a period. Clock generators run in
    /// the background and never keep a run alive on their own.
    pub fn add_clock(&mut self, domain: DomainId, period: SimTime) -> Result<ProcessId, SimError> {
        if self.started {
            return Err(SimError::AlreadyStarted { what: "clocks" });
        }
        let dom = self
            .netlist
            .domain(domain)
            .ok_or_else(|| SimError::UnknownDomain(domain.to_string()))?;
        let name = self.netlist.name(dom.name).to_string();
        let clock = dom.clock;
        if period.as_fs() < 2 {
            return Err(SimError::InvalidClockPeriod {
                domain: name,
                period,
            });
        }
        if let Some(Driver::Comb(_)) = self.netlist.driver(clock) {
            return Err(SimError::DrivenSignal {
                signal: self.netlist.signal_name(clock),
            });
        }
        if !self.clocked.insert(domain) {
            return Err(SimError::ClockAlreadyDriven { domain: name });
        }
        debug!(domain = %name, %period, "clock generator added");
        Ok(self.spawn(format!("clock({name})"), true, move |ctx| {
            clock_generator(ctx, clock, period)
        }))
    }

    /// Attaches an observer. Its hooks fire for the whole run.
    pub fn attach<O: Observer>(&mut self, observer: O) -> Result<ObserverHandle<O>, SimError> {
        if self.started {
            return Err(SimError::AlreadyStarted { what: "observers" });
        }
        Ok(self.observers.attach(observer))
    }

    /// Returns an attached observer, for reading its results.
    pub fn observer<O: Observer>(&self, handle: ObserverHandle<O>) -> Option<&O> {
        self.observers.get(handle)
    }

    fn spawn<F, Fut>(&mut self, name: String, background: bool, body: F) -> ProcessId
    where
        F: FnOnce(TestbenchContext) -> Fut,
        Fut: Future<Output = TestbenchResult> + 'static,
    {
        let id = ProcessId(self.processes.len() as u32);
        let mailbox = Rc::new(RefCell::new(Mailbox::default()));
        let ctx = TestbenchContext::new(Rc::clone(&self.shared), Rc::clone(&mailbox));
        self.processes.push(ProcessSlot {
            name,
            background,
            future: Some(Box::pin(body(ctx))),
            mailbox,
        });
        id
    }

    /// Runs the simulation.
    ///
    /// `max_cycles` overrides [`SimConfig::max_cycles`]. The run ends when
    /// every testbench has finished, when a cycle or time limit is reached,
    /// or when nothing is left to do. Without testbenches and without any
    /// limit, the run ends right after the initial settle.
    ///
    /// On error the run is aborted; committed values and observer results
    /// remain queryable.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<SimResult, SimError> {
        if self.started {
            return Err(SimError::AlreadyRan);
        }
        self.started = true;
        let max_cycles = max_cycles.or(self.config.max_cycles);
        let time_limit = self.config.time_limit;
        let foreground = self.processes.iter().any(|p| !p.background);
        info!(
            processes = self.processes.len(),
            observers = self.observers.len(),
            ?max_cycles,
            ?time_limit,
            "simulation started"
        );

        self.initial_settle()?;

        if !foreground && max_cycles.is_none() && time_limit.is_none() {
            return Ok(self.finish(StopReason::Completed));
        }

        for index in 0..self.processes.len() {
            self.queue
                .push(SimTime::ZERO, EventKind::DelayWake(ProcessId(index as u32)));
        }

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.finish(StopReason::Cancelled));
            }
            if foreground && !self.foreground_pending() {
                return Ok(self.finish(StopReason::Completed));
            }
            let Some(event) = self.queue.peek().copied() else {
                if foreground {
                    warn!("event queue drained with testbenches still waiting");
                }
                return Ok(self.finish(StopReason::Completed));
            };
            if let Some(limit) = time_limit.filter(|&limit| event.time > limit) {
                self.shared.now.set(limit);
                return Ok(self.finish(StopReason::TimeLimit));
            }
            let cycles_done = max_cycles.is_some_and(|max| self.stats.cycles >= max);
            let is_edge = matches!(event.kind, EventKind::EdgeCheck(_));
            if cycles_done && (is_edge || event.time > self.now()) {
                return Ok(self.finish(StopReason::CycleLimit));
            }

            self.shared.now.set(event.time);
            match event.kind {
                EventKind::EdgeCheck(_) => {
                    let domains = self.queue.drain_edges_at(event.time);
                    self.edge_step(domains)?;
                }
                EventKind::TickWake(pid, _) | EventKind::DelayWake(pid) => {
                    self.queue.pop();
                    self.resume(pid)?;
                }
            }
        }
    }

    fn foreground_pending(&self) -> bool {
        self.processes
            .iter()
            .any(|p| !p.background && p.future.is_some())
    }

    fn finish(&self, stop_reason: StopReason) -> SimResult {
        let result = SimResult {
            final_time: self.now(),
            cycles: self.stats.cycles,
            edges: self.stats.edges,
            settles: self.stats.settles,
            stop_reason,
        };
        info!(
            final_time = %result.final_time,
            cycles = result.cycles,
            edges = result.edges,
            reason = ?result.stop_reason,
            "simulation finished"
        );
        result
    }

    /// Evaluates every combinational rule once against the initial values.
    fn initial_settle(&mut self) -> Result<(), SimError> {
        let pending = (0..self.netlist.comb_rules().len()).collect();
        self.settle_and_detect(pending, Vec::new())
    }

    /// Settles `pending` rules, then queues the edges implied by
    /// `changes` and by the settle itself.
    fn settle_and_detect(
        &mut self,
        pending: BTreeSet<usize>,
        changes: Vec<Change>,
    ) -> Result<(), SimError> {
        let now = self.now();
        let settled = {
            let mut store = self.shared.store.borrow_mut();
            settle(
                &self.netlist,
                &mut store,
                &mut self.observers,
                now,
                self.config.max_settle_iterations,
                pending,
            )?
        };
        if settled.rounds > 0 {
            self.stats.settles += 1;
        }
        let mut edges = active_edges(&self.netlist, &changes);
        edges.extend(active_edges(&self.netlist, &settled.changes));
        for domain in edges {
            self.queue.push(now, EventKind::EdgeCheck(domain));
        }
        Ok(())
    }

    /// Runs one atomic registered-update step for every domain with an
    /// edge at the current instant, settles, and wakes tick waiters.
    fn edge_step(&mut self, domains: Vec<DomainId>) -> Result<(), SimError> {
        let mut seen = BTreeSet::new();
        let domains: Vec<DomainId> = domains.into_iter().filter(|d| seen.insert(*d)).collect();
        let now = self.now();
        let changes = {
            let mut store = self.shared.store.borrow_mut();
            registered_step(&self.netlist, &mut store, &mut self.observers, now, &domains)?
        };
        self.stats.cycles += 1;
        self.stats.edges += domains.len() as u64;
        debug!(
            time = %now,
            cycle = self.stats.cycles,
            domains = domains.len(),
            changed = changes.len(),
            "edge step"
        );

        let pending = rules_reading(&self.netlist, changes.iter().map(|c| c.signal));
        self.settle_and_detect(pending, changes)?;

        for domain in domains {
            if let Some(waiters) = self.tick_waiters.get_mut(domain.index()) {
                for pid in std::mem::take(waiters) {
                    self.queue.push(now, EventKind::TickWake(pid, domain));
                }
            }
        }
        Ok(())
    }

    fn identity(&self, pid: ProcessId) -> ProcessIdentity {
        ProcessIdentity::Testbench {
            id: pid.as_raw(),
            name: self.processes[pid.as_raw() as usize].name.clone(),
        }
    }

    /// Wraps an invalid request made by `pid` with its identity and the
    /// current time.
    fn fault(&self, pid: ProcessId, source: SimError) -> SimError {
        SimError::Fault {
            process: self.identity(pid),
            time: self.now(),
            source: Box::new(source),
        }
    }

    fn process_error(&self, pid: ProcessId, message: String) -> SimError {
        ProcessError {
            process: self.identity(pid),
            time: self.now(),
            message,
        }
        .into()
    }

    /// Polls a process until its next suspension point, then commits its
    /// writes and schedules its wake-up.
    fn resume(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let index = pid.as_raw() as usize;
        let Some(future) = self.processes[index].future.as_mut() else {
            return Ok(());
        };
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let outcome =
            quietly(|| panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx))));

        match outcome {
            Ok(Poll::Pending) => {
                self.flush_writes(pid)?;
                let request = self.processes[index].mailbox.borrow_mut().request.take();
                match request {
                    Some(request) => self.schedule(pid, request),
                    None => Err(self.process_error(
                        pid,
                        "suspended without awaiting a simulator request".to_string(),
                    )),
                }
            }
            Ok(Poll::Ready(Ok(()))) => {
                self.processes[index].future = None;
                debug!(process = %self.processes[index].name, time = %self.now(), "process finished");
                self.flush_writes(pid)
            }
            Ok(Poll::Ready(Err(e))) => {
                self.processes[index].future = None;
                Err(self.process_error(pid, e.to_string()))
            }
            Err(payload) => {
                self.processes[index].future = None;
                Err(self.process_error(pid, panic_message(payload.as_ref())))
            }
        }
    }

    fn schedule(&mut self, pid: ProcessId, request: WaitRequest) -> Result<(), SimError> {
        let now = self.now();
        match request {
            WaitRequest::Tick(domain) => match self.tick_waiters.get_mut(domain.index()) {
                Some(waiters) => waiters.push(pid),
                None => return Err(self.fault(pid, SimError::UnknownDomain(domain.to_string()))),
            },
            WaitRequest::Delay(duration) => {
                let at = now
                    .checked_add(duration)
                    .ok_or_else(|| self.process_error(pid, format!("delay {duration} overflows")))?;
                self.queue.push(at, EventKind::DelayWake(pid));
            }
            WaitRequest::Settle => self.queue.push(now, EventKind::DelayWake(pid)),
        }
        Ok(())
    }

    /// Reports a process's recorded statement hits, commits its staged
    /// writes as one batch, notifies observers, settles, and queues any
    /// implied edges.
    fn flush_writes(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let (hits, writes, fault) = {
            let mut mailbox = self.processes[pid.as_raw() as usize].mailbox.borrow_mut();
            (
                std::mem::take(&mut mailbox.hits),
                std::mem::take(&mut mailbox.writes),
                mailbox.fault.take(),
            )
        };
        if let Some(fault) = fault {
            return Err(self.fault(pid, fault));
        }
        if !hits.is_empty() {
            let ctx = HookContext {
                time: self.now(),
                netlist: &self.netlist,
            };
            for statement in hits {
                self.observers.statement_hit(&ctx, statement);
            }
        }
        if writes.is_empty() {
            return Ok(());
        }
        let changes = {
            let mut store = self.shared.store.borrow_mut();
            let mut targets = Vec::with_capacity(writes.len());
            for (signal, value) in writes {
                store.stage(signal, value);
                targets.push(signal);
            }
            store.commit(&targets)
        };
        if changes.is_empty() {
            return Ok(());
        }
        let ctx = HookContext {
            time: self.now(),
            netlist: &self.netlist,
        };
        self.observers.committed(&ctx, &changes);
        let pending = rules_reading(&self.netlist, changes.iter().map(|c| c.signal));
        self.settle_and_detect(pending, changes)
    }
}
