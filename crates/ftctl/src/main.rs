//! ftctl - fault tolerance calibration runner
//!
//! Runs the rtos-ft calibration scenarios against the host platform and
//! reports what each one observed.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod error;
mod output;
mod scenarios;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;
use crate::scenarios::Scenario;

#[derive(Parser)]
#[command(name = "ftctl")]
#[command(about = "Fault tolerance calibration runner - exercise detection, dispatch and recovery")]
#[command(version)]
#[command(long_about = "
ftctl drives the rtos-ft core through its calibration scenarios on the host:
an application assertion, a CRC error, a supply brownout, a peripheral
timeout, a gated report and a fault storm.

Resets are simulated. Use --json for machine-readable output.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(long, global = true, help = "Output in JSON format for machine parsing")]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a calibration scenario
    Scenario {
        /// Scenario to run
        #[arg(value_enum, default_value = "all")]
        scenario: Scenario,

        /// Reports sent by the storm scenario
        #[arg(long, default_value_t = 1_000)]
        count: u32,
    },

    /// List the fault taxonomy
    Kinds,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ftctl={log_level},rtos_ft={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Scenario { scenario, count } => {
            if *count == 0 {
                return Err(CliError::InvalidArgument("--count must be at least 1".into()).into());
            }
            tracing::info!(scenario = scenario.name(), "Running calibration");
            let reports = scenarios::run(*scenario, *count)?;
            output::print_reports(&reports, cli.json)?;
            Ok(())
        }
        Commands::Kinds => {
            output::print_kinds(cli.json)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_scenario_defaults_to_all() -> TestResult {
        let cli = Cli::try_parse_from(["ftctl", "scenario"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(matches!(
            cli.command,
            Commands::Scenario {
                scenario: Scenario::All,
                count: 1_000
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_named_scenario_with_flags() -> TestResult {
        let cli = Cli::try_parse_from(["ftctl", "--json", "-vv", "scenario", "brownout"])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Scenario {
                scenario: Scenario::Brownout,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_rejects_unknown_scenario() {
        assert!(matches!(
            Cli::try_parse_from(["ftctl", "scenario", "meltdown"]),
            Err(_)
        ));
    }

    #[test]
    fn every_scenario_passes() -> TestResult {
        let reports = scenarios::run(Scenario::All, 100)?;
        assert_eq!(reports.len(), 6);
        assert!(reports.iter().all(|r| r.completed));
        Ok(())
    }

    #[test]
    fn brownout_resets_once() -> TestResult {
        let reports = scenarios::run(Scenario::Brownout, 1)?;
        let report = reports.first().ok_or("no report")?;
        assert_eq!(report.resets, 1);
        assert_eq!(report.disposition, rtos_ft::Disposition::RebootPending);
        Ok(())
    }

    #[test]
    fn exit_codes_are_distinct() {
        let failed = CliError::ScenarioFailed {
            name: "crc",
            reason: "x".into(),
        };
        assert_eq!(failed.exit_code(), 2);
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(
            CliError::FaultTolerance(rtos_ft::FtError::NotInstalled).exit_code(),
            3
        );
    }
}
