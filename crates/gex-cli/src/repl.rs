//! Read-evaluate loop over one long-lived session

use crate::command::ControlCommand;
use crate::render;
use colored::Colorize;
use gex_core::{BatchHalt, GraphSession};
use rustyline::{error::ReadlineError, Config, EditMode, Editor};
use std::io::{self, Write};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

pub const PROMPT: &str = ":> ";

/// What the loop does after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Handle one input line: a control command or a batch of queries.
///
/// Per-query failures are printed and the loop continues. A lost or closed
/// session ends the loop once the outcomes gathered so far are printed.
pub async fn evaluate<W: Write>(
    session: &mut dyn GraphSession,
    line: &str,
    out: &mut W,
    cancel: &CancellationToken,
) -> io::Result<Flow> {
    if let Some(command) = ControlCommand::parse(line) {
        return match command {
            ControlCommand::Quit => Ok(Flow::Exit),
            ControlCommand::ClearScreen => {
                write!(out, "\x1B[2J\x1B[1;1H")?;
                out.flush()?;
                Ok(Flow::Continue)
            }
            ControlCommand::Help => {
                render::write_help(out)?;
                Ok(Flow::Continue)
            }
            ControlCommand::Unknown(text) => {
                writeln!(out, "{}", format!("Unknown command: {text} (try :h)").yellow())?;
                Ok(Flow::Continue)
            }
        };
    }

    let batch = gex_core::split(line);
    if batch.is_empty() {
        return Ok(Flow::Continue);
    }

    let report = gex_core::run_until_cancelled(session, &batch, cancel).await;
    render::write_report(out, &report)?;
    writeln!(out)?;

    match report.halt {
        Some(BatchHalt::Transport { .. }) | Some(BatchHalt::SessionClosed { .. }) => {
            Ok(Flow::Exit)
        }
        None | Some(BatchHalt::Cancelled { .. }) => Ok(Flow::Continue),
    }
}

/// Evaluate a line, cancelling the batch on Ctrl-C
pub async fn evaluate_interruptible<W: Write>(
    session: &mut dyn GraphSession,
    line: &str,
    out: &mut W,
) -> io::Result<Flow> {
    let cancel = CancellationToken::new();
    let evaluation = evaluate(session, line, out, &cancel);
    tokio::pin!(evaluation);

    tokio::select! {
        flow = &mut evaluation => flow,
        Ok(()) = tokio::signal::ctrl_c() => {
            cancel.cancel();
            evaluation.await
        }
    }
}

/// Run the console until `:q`, Ctrl-D, or the session is lost
pub fn run(runtime: &Runtime, session: &mut dyn GraphSession) -> anyhow::Result<()> {
    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    let mut rl = Editor::<(), _>::with_config(config)?;
    let mut stdout = io::stdout();

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {err}").red());
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str())?;

        let flow = runtime.block_on(evaluate_interruptible(session, &line, &mut stdout))?;
        if flow == Flow::Exit {
            break;
        }
    }

    println!("{}", "Goodbye!".green());
    Ok(())
}
