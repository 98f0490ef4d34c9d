//! Parsing and validation of `strobe.toml` simulation configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`StrobeConfig`], then resolves it into the engine's
//! [`SimConfig`](strobe_sim::SimConfig) and [`RunSetup`](strobe_sim::RunSetup).

#![warn(missing_docs)]

pub mod duration;
pub mod error;
pub mod loader;
pub mod resolve;
pub mod settings;

pub use duration::parse_duration;
pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_run, ResolvedRun};
pub use settings::*;
