//! Errors raised while building, validating or loading a netlist.

/// A netlist references something it does not declare, or declares
/// something twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A rule or domain refers to a signal ID that was never declared.
    #[error("{context} references undeclared signal id {id}")]
    UnknownSignal {
        /// Where the reference appears.
        context: String,
        /// The raw signal index.
        id: u32,
    },

    /// A registered rule refers to a domain ID that was never declared.
    #[error("{context} references undeclared domain id {id}")]
    UnknownDomain {
        /// Where the reference appears.
        context: String,
        /// The raw domain index.
        id: u32,
    },

    /// A declaration's ID does not match its position in the declaration list.
    #[error("{kind} '{name}' declares id {declared}, expected {expected}")]
    MisnumberedId {
        /// `signal` or `domain`.
        kind: &'static str,
        /// The declared name.
        name: String,
        /// The ID given in the declaration.
        declared: u32,
        /// The ID implied by position.
        expected: u32,
    },

    /// Two declarations share an ID.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// `signal` or `domain`.
        kind: &'static str,
        /// The repeated raw ID.
        id: u32,
    },

    /// Two declarations of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// `signal`, `domain` or `statement`.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A signal is the target of more than one rule.
    #[error("signal '{signal}' is driven by more than one rule")]
    MultipleDrivers {
        /// The multiply-driven signal.
        signal: String,
    },

    /// A signal was declared with zero width.
    #[error("signal '{signal}' has zero width")]
    ZeroWidth {
        /// The offending signal.
        signal: String,
    },

    /// A declared initial or reset value does not fit the signal.
    #[error("{which} value of signal '{signal}' needs {value_width} bits but the signal has {width}")]
    ValueOutOfRange {
        /// `initial` or `reset`.
        which: &'static str,
        /// The offending signal.
        signal: String,
        /// Significant bits in the value.
        value_width: u32,
        /// Declared signal width.
        width: u32,
    },

    /// A clock or reset input of a domain is wider than one bit.
    #[error("{role} signal '{signal}' of domain '{domain}' must be 1 bit wide, found {width}")]
    NotSingleBit {
        /// `clock` or `reset`.
        role: &'static str,
        /// The domain.
        domain: String,
        /// The signal.
        signal: String,
        /// Its width.
        width: u32,
    },

    /// A slice selects bits outside its operand.
    #[error("statement '{statement}': slice [{high}:{low}] out of range for a {width}-bit operand")]
    InvalidSlice {
        /// The statement containing the slice.
        statement: String,
        /// High bit index.
        high: u32,
        /// Low bit index.
        low: u32,
        /// Operand width.
        width: u32,
    },

    /// A case pattern's width differs from its subject's.
    #[error("statement '{statement}': pattern '{pattern}' has {pattern_width} bits, subject has {subject_width}")]
    PatternWidth {
        /// The statement containing the match.
        statement: String,
        /// The pattern text.
        pattern: String,
        /// Positions in the pattern.
        pattern_width: u32,
        /// Width of the matched subject.
        subject_width: u32,
    },
}

/// The netlist describes hardware that cannot be simulated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// Combinational rules form a feedback cycle with no register in it.
    #[error("combinational loop through signals: {}", signals.join(" -> "))]
    CombinationalLoop {
        /// Names of the signals on the cycle.
        signals: Vec<String>,
    },

    /// Settling did not reach a fixpoint within the iteration cap.
    #[error("non-converging combinational loop: no fixpoint after {iterations} iterations (still changing: {})", signals.join(", "))]
    NonConverging {
        /// The configured iteration cap.
        iterations: u32,
        /// Names of signals still changing in the last round.
        signals: Vec<String>,
    },

    /// A write carries more significant bits than the target signal holds.
    #[error("value {value} does not fit signal '{signal}' ({width} bits)")]
    ValueTooWide {
        /// The written signal.
        signal: String,
        /// Declared width.
        width: u32,
        /// The rejected value, in binary.
        value: String,
    },
}

/// Any failure while turning a netlist description into a [`Netlist`](crate::Netlist).
#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    /// Undeclared or duplicate references.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Unsimulatable structure.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The JSON description could not be parsed.
    #[error("invalid netlist JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The description file could not be read.
    #[error("failed to read netlist: {0}")]
    Io(#[from] std::io::Error),
}
