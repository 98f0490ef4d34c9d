//! Shared helpers for CLI commands.
//!
//! Contains the steps `check` and `run` have in common: project root
//! resolution, configuration loading, netlist loading, and parsing of
//! `--clock` overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strobe_config::{load_config, load_config_file, StrobeConfig, CONFIG_FILE_NAME};
use strobe_ir::Netlist;
use strobe_sim::SimTime;
use tracing::debug;

use crate::GlobalArgs;

/// A loaded configuration and the directory its relative paths refer to.
pub struct Project {
    /// Directory containing `strobe.toml`, or the working directory.
    pub root: PathBuf,
    /// The parsed configuration (defaults when no file was found).
    pub config: StrobeConfig,
}

/// Walks up from `start` looking for the nearest directory containing
/// `strobe.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Loads the project configuration from global CLI args.
///
/// If `--config` is specified, uses that path (file → that file, dir →
/// `strobe.toml` inside it). Otherwise walks up from the current directory;
/// without any `strobe.toml` the defaults apply.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            let root = p
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok(Project {
                config: load_config_file(&p)?,
                root,
            });
        }
        return Ok(Project {
            config: load_config(&p)?,
            root: p,
        });
    }

    let cwd = std::env::current_dir()?;
    match find_project_root(&cwd) {
        Some(root) => {
            debug!(root = %root.display(), "using project configuration");
            Ok(Project {
                config: load_config(&root)?,
                root,
            })
        }
        None => Ok(Project {
            root: cwd,
            config: StrobeConfig::default(),
        }),
    }
}

/// Loads and validates the netlist named on the command line, falling back
/// to the configured `[netlist] path`.
pub fn load_netlist(
    arg: Option<&str>,
    configured: Option<&Path>,
) -> Result<(PathBuf, Arc<Netlist>), Box<dyn std::error::Error>> {
    let path = match (arg, configured) {
        (Some(arg), _) => PathBuf::from(arg),
        (None, Some(path)) => path.to_path_buf(),
        (None, None) => {
            return Err(
                "no netlist given; pass a path or set [netlist] path in strobe.toml".into(),
            )
        }
    };
    let netlist = Netlist::from_path(&path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((path, Arc::new(netlist)))
}

/// Parses a `--clock DOMAIN=PERIOD` override such as `sync=10ns`.
pub fn parse_clock_override(s: &str) -> Result<(String, SimTime), String> {
    let (domain, period) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DOMAIN=PERIOD, got '{s}'"))?;
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(format!("missing domain name in '{s}'"));
    }
    let period = strobe_config::parse_duration(period)
        .ok_or_else(|| format!("invalid clock period '{period}'"))?;
    Ok((domain.to_string(), period))
}
