//! Gremlin Explorer CLI
//!
//! Usage:
//!   gex                      interactive console
//!   gex exec "<queries>"     run one submission and exit

mod command;
mod render;
mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use gex_core::{AppConfig, BatchHalt, GraphSession};
use gex_gremlin::GremlinSession;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gex")]
#[command(about = "Run semicolon-separated Gremlin queries against a graph endpoint")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Collection to open instead of the configured one
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console (default)
    Repl,
    /// Run one submission and exit
    Exec {
        /// Queries separated by ';'
        query: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging.level);

    let collection = cli
        .collection
        .unwrap_or_else(|| config.gremlin.collection.clone());
    let target = config.gremlin.target(&collection)?;
    let endpoint = target.url();

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let mut session = runtime
        .block_on(GremlinSession::open(target))
        .with_context(|| format!("Failed to open session on {endpoint}"))?;

    let code = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            render::write_banner(&mut io::stdout(), &endpoint, &collection)?;
            repl::run(&runtime, &mut session)?;
            ExitCode::SUCCESS
        }
        Commands::Exec { query } => runtime.block_on(exec(&mut session, &query))?,
    };

    if let Err(e) = runtime.block_on(session.close()) {
        tracing::debug!("Session close: {}", e);
    }
    Ok(code)
}

/// One-shot mode: non-zero exit when the connection is lost mid-batch
async fn exec(session: &mut dyn GraphSession, query: &str) -> anyhow::Result<ExitCode> {
    let batch = gex_core::split(query);
    if batch.is_empty() {
        anyhow::bail!("No queries to run");
    }

    let cancel = tokio_util::sync::CancellationToken::new();
    let run = gex_core::run_until_cancelled(session, &batch, &cancel);
    tokio::pin!(run);
    let report = tokio::select! {
        report = &mut run => report,
        Ok(()) = tokio::signal::ctrl_c() => {
            cancel.cancel();
            run.await
        }
    };

    render::write_report(&mut io::stdout(), &report)?;

    Ok(match report.halt {
        None => ExitCode::SUCCESS,
        Some(BatchHalt::Cancelled { .. }) => ExitCode::from(130),
        Some(_) => ExitCode::FAILURE,
    })
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::from_env().context("Invalid configuration in environment")?,
    };
    Ok(config)
}

/// Logs go to stderr so they never interleave with query output
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("gex_core=warn,gex_gremlin=warn,gex={level}").into()
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
