//! Console rendering of batch outcomes

use colored::Colorize;
use gex_core::{BatchHalt, BatchReport, DiagnosticAttributes, ExecutedQuery, QueryOutcome};
use std::io::{self, Write};

const INDENT: &str = "    ";

/// One line with whichever diagnostics are present
pub fn diagnostics_line(diagnostics: &DiagnosticAttributes) -> String {
    let mut parts = Vec::new();
    if let Some(code) = diagnostics.status_code {
        parts.push(format!("status={code}"));
    }
    if let Some(charge) = diagnostics.request_charge {
        parts.push(format!("charge={charge}"));
    }
    if let Some(retry_after) = diagnostics.retry_after {
        parts.push(format!("retry-after={retry_after:?}"));
    }
    if let Some(id) = &diagnostics.correlation_id {
        parts.push(format!("activity={id}"));
    }

    if parts.is_empty() {
        "no diagnostics".to_string()
    } else {
        parts.join(" ")
    }
}

/// Write a single statement and its outcome
pub fn write_outcome<W: Write>(out: &mut W, executed: &ExecutedQuery) -> io::Result<()> {
    match &executed.outcome {
        QueryOutcome::Success { rows, diagnostics } => {
            writeln!(out, "{} {}", "ok".green().bold(), executed.query)?;
            if rows.is_empty() {
                writeln!(out, "{INDENT}{}", "(no results)".dimmed())?;
            }
            for row in rows {
                writeln!(out, "{INDENT}{row}")?;
            }
            writeln!(out, "{INDENT}{}", diagnostics_line(diagnostics).dimmed())?;
        }
        QueryOutcome::Failure {
            kind,
            message,
            diagnostics,
        } => {
            writeln!(
                out,
                "{} {} {}",
                "error".red().bold(),
                executed.query,
                format!("[{kind}]").red()
            )?;
            writeln!(out, "{INDENT}{message}")?;
            writeln!(out, "{INDENT}{}", diagnostics_line(diagnostics).dimmed())?;
        }
    }
    Ok(())
}

/// Write every outcome, then the reason the batch stopped early if it did
pub fn write_report<W: Write>(out: &mut W, report: &BatchReport) -> io::Result<()> {
    for executed in &report.entries {
        write_outcome(out, executed)?;
    }

    match &report.halt {
        None => {}
        Some(halt @ BatchHalt::Cancelled { .. }) => {
            writeln!(out, "{}", halt.to_string().yellow())?;
        }
        Some(halt) => {
            writeln!(out, "{}", halt.to_string().red().bold())?;
        }
    }
    Ok(())
}

pub fn write_banner<W: Write>(out: &mut W, endpoint: &str, collection: &str) -> io::Result<()> {
    writeln!(out, "{}", "Gremlin Explorer".bold().green())?;
    writeln!(out, "Connected to {} ({})", endpoint.cyan(), collection.cyan())?;
    writeln!(out, "Separate statements with ';'. Type ':h' for help, ':q' to quit.")?;
    writeln!(out)
}

pub fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "Available commands:".bold().green())?;
    writeln!(out, "  {}  - Show this help message", ":h, :help".cyan())?;
    writeln!(out, "  {}  - Exit the console", ":q, :quit".cyan())?;
    writeln!(out, "  {}  - Clear the screen", ":cls, :clear".cyan())?;
    writeln!(out, "\n{}", "Queries:".bold().green())?;
    writeln!(out, "  Statements on one line run in order, separated by ';'")?;
    writeln!(out, "  Ctrl-C cancels a running batch, Ctrl-D exits")?;
    writeln!(out, "\n{}", "Examples:".bold().green())?;
    writeln!(out, "  {}", "g.V().count(); g.E().count()".yellow())?;
    writeln!(out, "  {}", "g.V().hasLabel('person').values('name')".yellow())
}
