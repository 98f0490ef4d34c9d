//! Simulation error types.
//!
//! All failures of engine construction or a run surface as [`SimError`].
//! Netlist problems reuse the [`ConfigurationError`] and [`StructuralError`]
//! of `strobe_ir`; faults inside a running process become a
//! [`ProcessError`] carrying the process identity and simulated time.
//! Invalid requests made by a testbench keep their own kind and are wrapped
//! in [`SimError::Fault`] with the same identity and time.

use std::fmt;

use strobe_ir::{ConfigurationError, StructuralError};

use crate::time::SimTime;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The netlist references undeclared or duplicate entities.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The netlist or a write cannot be simulated faithfully.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A testbench or rule faulted; the run was aborted.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A testbench made an invalid request; the run was aborted.
    #[error("{process} faulted at {time}: {source}")]
    Fault {
        /// The requesting testbench.
        process: ProcessIdentity,
        /// Simulated time of the request.
        time: SimTime,
        /// What was wrong with the request.
        #[source]
        source: Box<SimError>,
    },

    /// A signal ID or name does not exist in the netlist.
    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    /// A domain ID or name does not exist in the netlist.
    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    /// A statement ID or name does not exist in the netlist.
    #[error("unknown statement: {0}")]
    UnknownStatement(String),

    /// A testbench wrote a signal that a rule drives.
    #[error("signal '{signal}' is driven by a rule and cannot be written by a testbench")]
    DrivenSignal {
        /// The written signal.
        signal: String,
    },

    /// Processes or observers were added after the run started.
    #[error("simulation already started; {what} must be added before run()")]
    AlreadyStarted {
        /// What was being added.
        what: &'static str,
    },

    /// A clock generator period is too short to toggle.
    #[error("invalid clock period {period} for domain '{domain}': must be at least 2 fs")]
    InvalidClockPeriod {
        /// The domain.
        domain: String,
        /// The rejected period.
        period: SimTime,
    },

    /// The domain's clock signal already has a generator.
    #[error("domain '{domain}' already has a clock generator")]
    ClockAlreadyDriven {
        /// The domain.
        domain: String,
    },

    /// `run()` was called on a simulator that has already run.
    #[error("simulation has already run; build a new simulator for another run")]
    AlreadyRan,
}

impl SimError {
    /// The underlying error, looking through any [`SimError::Fault`] wrapper.
    pub fn cause(&self) -> &SimError {
        match self {
            SimError::Fault { source, .. } => source.cause(),
            other => other,
        }
    }
}

/// Which process faulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessIdentity {
    /// A user-supplied testbench.
    Testbench {
        /// Registration index.
        id: u32,
        /// Name given at registration.
        name: String,
    },
    /// The internal process evaluating a combinational rule.
    Combinational {
        /// The rule's statement name.
        statement: String,
    },
    /// The registered-update step evaluating a registered rule.
    Registered {
        /// The rule's statement name.
        statement: String,
        /// The governing domain.
        domain: String,
    },
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessIdentity::Testbench { id, name } => write!(f, "testbench '{name}' (#{id})"),
            ProcessIdentity::Combinational { statement } => {
                write!(f, "combinational statement '{statement}'")
            }
            ProcessIdentity::Registered { statement, domain } => {
                write!(f, "registered statement '{statement}' in domain '{domain}'")
            }
        }
    }
}

/// An uncaught fault inside a process body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{process} faulted at {time}: {message}")]
pub struct ProcessError {
    /// The faulting process.
    pub process: ProcessIdentity,
    /// Simulated time of the fault.
    pub time: SimTime,
    /// The error or panic message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_error_display() {
        let e = ProcessError {
            process: ProcessIdentity::Testbench {
                id: 1,
                name: "stimulus".into(),
            },
            time: SimTime::from_ns(20),
            message: "expected 3, got 2".into(),
        };
        assert_eq!(
            e.to_string(),
            "testbench 'stimulus' (#1) faulted at 20 ns: expected 3, got 2"
        );
    }

    #[test]
    fn identity_display() {
        let c = ProcessIdentity::Combinational {
            statement: "y_eq".into(),
        };
        assert_eq!(c.to_string(), "combinational statement 'y_eq'");
        let r = ProcessIdentity::Registered {
            statement: "q_next".into(),
            domain: "sync".into(),
        };
        assert_eq!(r.to_string(), "registered statement 'q_next' in domain 'sync'");
    }

    #[test]
    fn wraps_structural() {
        let e: SimError = StructuralError::NonConverging {
            iterations: 4,
            signals: vec!["osc".into()],
        }
        .into();
        assert!(e.to_string().contains("non-converging"));
    }

    #[test]
    fn already_started_display() {
        let e = SimError::AlreadyStarted { what: "observers" };
        assert_eq!(
            e.to_string(),
            "simulation already started; observers must be added before run()"
        );
    }

    #[test]
    fn invalid_period_display() {
        let e = SimError::InvalidClockPeriod {
            domain: "sync".into(),
            period: SimTime::from_fs(1),
        };
        assert_eq!(
            e.to_string(),
            "invalid clock period 1 fs for domain 'sync': must be at least 2 fs"
        );
    }

    #[test]
    fn fault_names_process_and_keeps_kind() {
        let e = SimError::Fault {
            process: ProcessIdentity::Testbench {
                id: 0,
                name: "driver".into(),
            },
            time: SimTime::from_ns(15),
            source: Box::new(SimError::DrivenSignal {
                signal: "y".into(),
            }),
        };
        assert_eq!(
            e.to_string(),
            "testbench 'driver' (#0) faulted at 15 ns: signal 'y' is driven by a rule and cannot be written by a testbench"
        );
        assert!(matches!(e.cause(), SimError::DrivenSignal { signal } if signal == "y"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
