//! Resolution of a parsed configuration into engine settings.

use crate::duration::parse_duration;
use crate::error::ConfigError;
use crate::settings::{ClockDef, StrobeConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strobe_common::Frequency;
use strobe_sim::{RunSetup, SimConfig, SimTime};

/// A configuration with every string value parsed and every path resolved.
#[derive(Debug)]
pub struct ResolvedRun {
    /// The netlist file, resolved against the configuration's directory.
    pub netlist: Option<PathBuf>,
    /// Engine limits and checks.
    pub sim: SimConfig,
    /// Clock generators and coverage observers for [`strobe_sim::simulate`].
    pub setup: RunSetup,
}

/// Resolves `config`, interpreting relative paths against `base_dir`.
///
/// Clock definitions become generator periods; a frequency is converted to
/// its period rounded to whole femtoseconds.
pub fn resolve_run(config: &StrobeConfig, base_dir: &Path) -> Result<ResolvedRun, ConfigError> {
    let time_limit = config
        .sim
        .time_limit
        .as_deref()
        .map(|limit| {
            parse_duration(limit).ok_or_else(|| ConfigError::InvalidValue {
                field: "sim.time_limit".to_string(),
                value: limit.to_string(),
            })
        })
        .transpose()?;

    let mut clocks = BTreeMap::new();
    for (domain, def) in &config.clocks {
        clocks.insert(domain.clone(), clock_period(domain, def)?);
    }

    Ok(ResolvedRun {
        netlist: config.netlist.path.as_ref().map(|p| base_dir.join(p)),
        sim: SimConfig {
            max_settle_iterations: config.sim.max_settle_iterations,
            max_cycles: config.sim.max_cycles,
            time_limit,
            static_loop_check: config.sim.static_loop_check,
        },
        setup: RunSetup {
            clocks,
            statement_coverage: config.coverage.statement,
            toggle_coverage: config.coverage.toggle,
            stimulus: None,
        },
    })
}

/// Converts a clock definition into its period.
pub fn clock_period(domain: &str, def: &ClockDef) -> Result<SimTime, ConfigError> {
    match (&def.period, &def.frequency) {
        (Some(period), None) => {
            parse_duration(period).ok_or_else(|| ConfigError::InvalidValue {
                field: format!("clocks.{domain}.period"),
                value: period.clone(),
            })
        }
        (None, Some(freq)) => freq
            .parse::<Frequency>()
            .ok()
            .and_then(|f| f.period_fs())
            .map(SimTime::from_fs)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: format!("clocks.{domain}.frequency"),
                value: freq.clone(),
            }),
        (Some(_), Some(_)) => Err(ConfigError::ValidationError(format!(
            "clocks.{domain}: set either period or frequency, not both"
        ))),
        (None, None) => Err(ConfigError::MissingField(format!("clocks.{domain}.period"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn resolve_full_config() {
        let toml = r#"
[netlist]
path = "design/counter.json"

[sim]
max_cycles = 32
time_limit = "2us"

[clocks.sync]
period = "10ns"

[clocks.fast]
frequency = "250MHz"

[coverage]
toggle = true
"#;
        let config = load_config_from_str(toml).unwrap();
        let run = resolve_run(&config, Path::new("/work")).unwrap();
        assert_eq!(run.netlist, Some(PathBuf::from("/work/design/counter.json")));
        assert_eq!(run.sim.max_cycles, Some(32));
        assert_eq!(run.sim.time_limit, Some(SimTime::from_us(2)));
        assert!(run.sim.static_loop_check);
        assert_eq!(run.setup.clocks["sync"], SimTime::from_ns(10));
        assert_eq!(run.setup.clocks["fast"], SimTime::from_ns(4));
        assert!(run.setup.toggle_coverage);
        assert!(!run.setup.statement_coverage);
    }

    #[test]
    fn defaults_resolve_to_engine_defaults() {
        let config = load_config_from_str("").unwrap();
        let run = resolve_run(&config, Path::new(".")).unwrap();
        assert_eq!(run.sim, SimConfig::default());
        assert!(run.netlist.is_none());
        assert!(run.setup.clocks.is_empty());
    }

    #[test]
    fn bad_clock_values() {
        let def = ClockDef {
            period: Some("quick".to_string()),
            frequency: None,
        };
        let err = clock_period("sync", &def).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "clocks.sync.period"));

        let def = ClockDef {
            period: None,
            frequency: Some("0Hz".to_string()),
        };
        assert!(matches!(
            clock_period("sync", &def),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
