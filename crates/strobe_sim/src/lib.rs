//! Deterministic cycle-based simulation engine for strobe netlists.
//!
//! This crate executes an immutable [`Netlist`] against virtual clocks.
//! Combinational rules are driven to a fixpoint before any clock edge is
//! sampled, registered rules commit atomically at their domain's active
//! edge, and cooperative testbenches drive and observe the circuit tick by
//! tick. Observers attached before the run record statement and toggle
//! coverage.
//!
//! # Architecture
//!
//! - `store` holds committed and staged signal values.
//! - `eval` evaluates expressions over the committed snapshot.
//! - `settle` runs the combinational fixpoint with an iteration cap.
//! - `domain` detects active edges and runs registered-update steps.
//! - `queue` orders pending edge steps and process wake-ups.
//! - `process` provides the testbench context and its wait futures.
//! - `kernel` owns all of the above and runs the event loop.
//! - `observer` and `coverage` define instrumentation hooks.
//!
//! # Usage
//!
//! ```ignore
//! use strobe_sim::{SimConfig, SimTime, Simulator, StatementCoverage};
//!
//! let mut sim = Simulator::new(netlist, SimConfig::default())?;
//! sim.add_clock(sync, SimTime::from_ns(10))?;
//! let hits = sim.attach(StatementCoverage::new())?;
//! sim.add_testbench("stimulus", move |ctx| async move {
//!     ctx.write_u64(enable, 1);
//!     ctx.ticks(sync, 16).await;
//!     Ok(())
//! })?;
//! let result = sim.run(None)?;
//! println!("ended at {} after {} cycles", result.final_time, result.cycles);
//! ```

#![warn(missing_docs)]

pub mod coverage;
mod domain;
pub mod error;
pub mod eval;
pub mod kernel;
pub mod observer;
pub mod process;
pub mod queue;
mod settle;
pub mod store;
pub mod time;

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use strobe_common::ContentHash;
use strobe_ir::Netlist;
use tracing::info;

pub use coverage::{
    StatementCoverage, StatementCoverageResult, StatementReport, ToggleCounts, ToggleCoverage,
    ToggleCoverageResult, ToggleDirection, ToggleReport, TraceDigest,
};
pub use error::{ProcessError, ProcessIdentity, SimError};
pub use kernel::{CancelToken, SimResult, Simulator, StopReason};
pub use observer::{AsAny, HookContext, Observer, ObserverHandle, Transition};
pub use process::{Suspend, TestbenchContext, TestbenchResult};
pub use queue::ProcessId;
pub use store::{Change, SignalStore};
pub use time::SimTime;

/// Default cap on combinational settle rounds.
pub const DEFAULT_MAX_SETTLE_ITERATIONS: u32 = 1_000;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Settle rounds allowed before a non-converging loop is reported.
    pub max_settle_iterations: u32,
    /// Optional cycle limit; `run(Some(n))` overrides it.
    pub max_cycles: Option<u64>,
    /// Optional simulated-time limit.
    pub time_limit: Option<SimTime>,
    /// Reject netlists with combinational cycles before the run.
    pub static_loop_check: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_settle_iterations: DEFAULT_MAX_SETTLE_ITERATIONS,
            max_cycles: None,
            time_limit: None,
            static_loop_check: true,
        }
    }
}

/// Registers testbenches on a freshly built simulator.
///
/// Shared across threads by [`simulate_batch`], so it must build fresh
/// testbench state on every call.
pub type Stimulus = Arc<dyn Fn(&mut Simulator) -> Result<(), SimError> + Send + Sync>;

/// What [`simulate`] sets up around the netlist.
#[derive(Clone, Default)]
pub struct RunSetup {
    /// Clock generator periods, keyed by domain name.
    pub clocks: BTreeMap<String, SimTime>,
    /// Attach a [`StatementCoverage`] observer.
    pub statement_coverage: bool,
    /// Attach a [`ToggleCoverage`] observer.
    pub toggle_coverage: bool,
    /// Optional testbench registration.
    pub stimulus: Option<Stimulus>,
}

impl std::fmt::Debug for RunSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSetup")
            .field("clocks", &self.clocks)
            .field("statement_coverage", &self.statement_coverage)
            .field("toggle_coverage", &self.toggle_coverage)
            .field("stimulus", &self.stimulus.is_some())
            .finish()
    }
}

/// Everything a run produced. Coverage is kept even when the run aborted.
#[derive(Debug)]
pub struct RunReport {
    /// The run outcome.
    pub result: Result<SimResult, SimError>,
    /// Statement hit counts, if requested.
    pub statements: Option<StatementCoverageResult>,
    /// Per-bit toggle counts, if requested.
    pub toggles: Option<ToggleCoverageResult>,
    /// Digest of every observed hit and transition.
    pub digest: ContentHash,
}

/// Serializable summary of a [`RunReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// The result of a successful run.
    pub result: Option<SimResult>,
    /// The error message of an aborted run.
    pub error: Option<String>,
    /// Statement coverage report, if requested.
    pub statements: Option<StatementReport>,
    /// Toggle coverage report, if requested.
    pub toggles: Option<ToggleReport>,
    /// Trace digest, as hex.
    pub digest: String,
}

impl RunReport {
    /// Builds a serializable summary, resolving names through `netlist`.
    pub fn summary(&self, netlist: &Netlist) -> RunSummary {
        RunSummary {
            result: self.result.as_ref().ok().cloned(),
            error: self.result.as_ref().err().map(|e| e.to_string()),
            statements: self.statements.as_ref().map(|s| s.report(netlist)),
            toggles: self.toggles.as_ref().map(|t| t.report(netlist)),
            digest: self.digest.to_string(),
        }
    }
}

/// High-level entry point: builds a simulator, applies `setup`, and runs it.
///
/// Errors while building the simulator or applying the setup are returned
/// directly; a run that aborts is reported through [`RunReport::result`].
pub fn simulate(
    netlist: Arc<Netlist>,
    config: &SimConfig,
    setup: &RunSetup,
) -> Result<RunReport, SimError> {
    let mut sim = Simulator::new(Arc::clone(&netlist), config.clone())?;

    for (name, period) in &setup.clocks {
        let domain = netlist
            .find_domain(name)
            .ok_or_else(|| SimError::UnknownDomain(name.clone()))?;
        sim.add_clock(domain, *period)?;
    }
    let statements = setup
        .statement_coverage
        .then(|| sim.attach(StatementCoverage::new()))
        .transpose()?;
    let toggles = setup
        .toggle_coverage
        .then(|| sim.attach(ToggleCoverage::new()))
        .transpose()?;
    let digest = sim.attach(TraceDigest::new())?;
    if let Some(stimulus) = &setup.stimulus {
        stimulus(&mut sim)?;
    }

    let result = sim.run(None);
    Ok(RunReport {
        result,
        statements: statements.and_then(|h| sim.observer(h)).map(|o| o.get_result()),
        toggles: toggles.and_then(|h| sim.observer(h)).map(|o| o.get_result()),
        digest: sim
            .observer(digest)
            .map(|o| o.get_result())
            .unwrap_or_default(),
    })
}

/// Runs independent simulations of `netlist` in parallel.
///
/// Each run gets its own engine; nothing mutable is shared between them, so
/// every report matches what [`simulate`] returns for the same inputs.
pub fn simulate_batch(
    netlist: &Arc<Netlist>,
    runs: &[(SimConfig, RunSetup)],
) -> Vec<Result<RunReport, SimError>> {
    info!(runs = runs.len(), "starting simulation batch");
    runs.par_iter()
        .map(|(config, setup)| simulate(Arc::clone(netlist), config, setup))
        .collect()
}
