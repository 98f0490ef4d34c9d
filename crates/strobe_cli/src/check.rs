//! `strobe check`: load and validate a netlist without simulating it.

use crate::pipeline::{load_netlist, load_project};
use crate::{CheckArgs, GlobalArgs};

/// Runs the `strobe check` command.
///
/// Loads the netlist, which validates every reference, width and driver,
/// then looks for combinational loops. Returns exit code 0 if the netlist
/// can be simulated, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let configured = project
        .config
        .netlist
        .path
        .as_ref()
        .map(|p| project.root.join(p));
    let (path, netlist) = load_netlist(args.netlist.as_deref(), configured.as_deref())?;

    let loops = netlist.combinational_loops();
    for signals in &loops {
        eprintln!("error: combinational loop through signals: {}", signals.join(" -> "));
    }

    if !global.quiet {
        eprintln!(
            "   Checked {}: {} signals, {} combinational rules, {} registered rules, {} domains",
            path.display(),
            netlist.signals().len(),
            netlist.comb_rules().len(),
            netlist.registered_rules().len(),
            netlist.domains().len(),
        );
    }

    Ok(if loops.is_empty() { 0 } else { 1 })
}
