//! Output formatting for ftctl

use anyhow::Error;
use colored::*;
use rtos_ft::{Disposition, FaultKind};
use serde_json::json;

use crate::error::CliError;
use crate::scenarios::ScenarioReport;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::ScenarioFailed { .. }) => "scenario_failed",
        Some(CliError::InvalidArgument(_)) => "invalid_argument",
        Some(CliError::FaultTolerance(_)) => "fault_tolerance",
        Some(CliError::JsonError(_)) => "json",
        None => "other",
    }
}

/// Print scenario results in the requested format
pub fn print_reports(reports: &[ScenarioReport], json: bool) -> Result<(), CliError> {
    if json {
        let output = json!({
            "success": true,
            "scenarios": reports
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Calibration scenarios:".bold());
    for report in reports {
        print_report_human(report);
    }
    Ok(())
}

fn print_report_human(report: &ScenarioReport) {
    let mark = if report.completed {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "  {} {:<9} {:<20} -> {}",
        mark,
        report.name,
        report.kind.as_str(),
        colored_disposition(report.disposition)
    );
    println!(
        "      handler calls: {}  state: {}  resets: {}",
        report.handler_calls, report.state, report.resets
    );
    if let Some(cause) = report.reboot_cause {
        println!("      reboot cause: {}", cause.to_string().yellow());
    }
    if let Some(totals) = report.totals {
        println!(
            "      reported: {}  dispatched: {}  gated: {}  unhandled: {}",
            totals.reported, totals.dispatched, totals.gated, totals.unhandled
        );
    }
}

fn colored_disposition(disposition: Disposition) -> ColoredString {
    let text = disposition.to_string();
    match disposition {
        Disposition::Recovered => text.green(),
        Disposition::Retry | Disposition::Gated => text.cyan(),
        Disposition::Failed | Disposition::Unhandled { .. } => text.yellow(),
        Disposition::RebootPending | Disposition::Suppressed => text.red(),
    }
}

/// Print the fault taxonomy
pub fn print_kinds(json: bool) -> Result<(), CliError> {
    if json {
        let kinds: Vec<_> = FaultKind::ALL
            .iter()
            .map(|kind| {
                json!({
                    "raw": kind.to_raw(),
                    "name": kind.as_str(),
                    "severity": kind.default_severity().as_str(),
                    "domain": kind.default_domain().as_str(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "success": true, "kinds": kinds }))?
        );
        return Ok(());
    }

    println!("{}", "Fault kinds:".bold());
    for kind in FaultKind::ALL {
        println!(
            "  {:>2}  {:<20} {:<9} {}",
            kind.to_raw(),
            kind.as_str(),
            kind.default_severity().as_str(),
            kind.default_domain().as_str().dimmed()
        );
    }
    Ok(())
}
