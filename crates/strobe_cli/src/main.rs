//! The `strobe` command-line front end for the simulation engine.
//!
//! Provides `strobe check` for validating a netlist and `strobe run` for
//! simulating it with free-running clocks and reporting coverage.

#![warn(missing_docs)]

mod check;
mod pipeline;
mod run;

use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use strobe_sim::SimTime;

/// A deterministic cycle-based hardware simulator.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe simulation engine")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a custom `strobe.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a netlist and look for combinational loops.
    Check(CheckArgs),
    /// Simulate a netlist.
    Run(RunArgs),
}

/// Arguments for the `strobe check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Netlist JSON file (default: `[netlist] path` from `strobe.toml`).
    pub netlist: Option<String>,
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Netlist JSON file (default: `[netlist] path` from `strobe.toml`).
    pub netlist: Option<String>,

    /// Stop after this many clock cycles.
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Simulation time limit (e.g., "100ns", "1us", "10ms").
    #[arg(long)]
    pub time: Option<String>,

    /// Drive a domain's clock, e.g. `--clock sync=10ns`. Repeatable.
    #[arg(long, value_parser = pipeline::parse_clock_override)]
    pub clock: Vec<(String, SimTime)>,

    /// Record statement and toggle coverage.
    #[arg(long)]
    pub coverage: bool,

    /// Skip the static combinational loop check.
    #[arg(long)]
    pub no_loop_check: bool,

    /// Output format for the run report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

/// Maps `-q`/`-v` to a default log filter; `RUST_LOG` takes precedence.
fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter(quiet, verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
