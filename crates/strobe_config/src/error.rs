//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `strobe.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A duration or frequency string could not be parsed.
    #[error("invalid {field} '{value}'")]
    InvalidValue {
        /// The offending field, e.g. `clocks.sync.period`.
        field: String,
        /// The rejected text.
        value: String,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
