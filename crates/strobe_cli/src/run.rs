//! `strobe run`: simulate a netlist with free-running clocks.
//!
//! Loads `strobe.toml` (if any), applies command-line overrides, runs the
//! engine, and prints the run summary and coverage as text or JSON.

use std::sync::Arc;

use strobe_config::{parse_duration, resolve_run};
use strobe_sim::{RunSummary, StatementReport, ToggleReport};
use tracing::warn;

use crate::pipeline::{load_netlist, load_project};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `strobe run` command.
///
/// Returns exit code 0 if the run completed or stopped at a limit, 1 if it
/// aborted with an error.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let mut resolved = resolve_run(&project.config, &project.root)?;

    if let Some(cycles) = args.cycles {
        resolved.sim.max_cycles = Some(cycles);
    }
    if let Some(ref time) = args.time {
        let limit = parse_duration(time).ok_or_else(|| format!("invalid duration '{time}'"))?;
        resolved.sim.time_limit = Some(limit);
    }
    for (domain, period) in &args.clock {
        resolved.setup.clocks.insert(domain.clone(), *period);
    }
    if args.coverage {
        resolved.setup.statement_coverage = true;
        resolved.setup.toggle_coverage = true;
    }
    if args.no_loop_check {
        resolved.sim.static_loop_check = false;
    }

    let (path, netlist) = load_netlist(args.netlist.as_deref(), resolved.netlist.as_deref())?;
    if resolved.sim.max_cycles.is_none() && resolved.sim.time_limit.is_none() {
        warn!("no cycle or time limit set; only the initial settle will run");
    }
    if !global.quiet {
        eprintln!("   Simulating {}", path.display());
    }

    let report = strobe_sim::simulate(Arc::clone(&netlist), &resolved.sim, &resolved.setup)?;
    let summary = report.summary(&netlist);

    match args.format {
        ReportFormat::Text => print_text(&summary),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    match report.result {
        Ok(_) => Ok(0),
        Err(e) => {
            eprintln!("error: {e}");
            Ok(1)
        }
    }
}

fn print_text(summary: &RunSummary) {
    if let Some(ref result) = summary.result {
        println!(
            "finished at {} ({}): {} cycles, {} edges, {} settles",
            result.final_time, result.stop_reason, result.cycles, result.edges, result.settles
        );
    }
    if let Some(ref statements) = summary.statements {
        print_statements(statements);
    }
    if let Some(ref toggles) = summary.toggles {
        print_toggles(toggles);
    }
    println!("digest: {}", summary.digest);
}

fn print_statements(report: &StatementReport) {
    println!(
        "statement coverage: {}/{} ({:.1}%)",
        report.covered,
        report.total,
        report.percent()
    );
    for entry in &report.statements {
        println!("  {:<24} {}", entry.name, entry.hits);
    }
}

fn print_toggles(report: &ToggleReport) {
    println!(
        "toggle coverage: {}/{} bits ({:.1}%)",
        report.toggled_bits,
        report.total_bits,
        report.percent()
    );
    for signal in &report.signals {
        let bits: Vec<String> = signal
            .bits
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{i}] {}/{}", c.zero_to_one, c.one_to_zero))
            .collect();
        println!("  {:<24} {}", signal.name, bits.join(" "));
    }
}
