//! STAX command-line shell
//!
//! Connects to every configured database at once and runs SQL or dot
//! directives against whichever one is current.
//!
//! # Usage
//!
//! ```bash
//! # Start the interactive console
//! stax --config ~/.stax/config.toml
//!
//! # Run a single line and exit
//! stax -c "select count(*) from orders"
//!
//! # Run a script file against one database
//! stax --database warehouse -f nightly.sql
//!
//! # Serve remote line sessions until Ctrl+C
//! stax --listen 127.0.0.1:2000
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stax_core::{CoreError, DisplayMode, Session, SharedState};

mod commands;
mod config;
mod repl;
mod server;

use commands::CommandResult;
use config::StaxConfig;
use repl::Repl;
use server::LineServer;

/// STAX multi-database shell
#[derive(Parser, Debug)]
#[command(
    name = "stax",
    author = "STAX Team",
    version,
    about = "Interactive shell for querying several databases at once",
    long_about = "Connects to every database named in the configuration file and runs\n\
                  SQL or dot directives against the current one. Results can be stored\n\
                  in named variables and joined across databases."
)]
struct Args {
    /// Configuration file path
    #[arg(long, value_name = "FILE", env = "STAX_CONFIG")]
    config: Option<PathBuf>,

    /// Database to select at startup
    #[arg(short = 'd', long, env = "STAX_DATABASE")]
    database: Option<String>,

    /// Initial display mode (default, json, csv, xml, table)
    #[arg(short = 'm', long)]
    mode: Option<String>,

    /// Run a single line and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Run a script file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Serve remote line sessions on this address
    #[arg(short = 'l', long, value_name = "ADDR", env = "STAX_LISTEN")]
    listen: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Suppress banner and connection report
    #[arg(short = 'q', long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    let mode: DisplayMode = config.mode.parse().map_err(CoreError::Config)?;

    let shared = Arc::new(SharedState::new(
        config.databases.clone(),
        config.query_timeout(),
    ));
    let report = commands::connection_report(&shared.connect_all().await);
    if !args.quiet {
        println!("{}", report);
    }

    let mut session = Session::new(
        Arc::clone(&shared),
        config.initial_database(args.database.as_deref()),
        mode,
    );
    info!("Current database: '{}'", session.current());

    if let Some(line) = &args.command {
        execute_line(&mut session, line).await;
        Ok(())
    } else if let Some(file) = &args.file {
        execute_file(&mut session, file).await
    } else if let Some(addr) = &config.listen {
        serve(session, addr).await
    } else {
        run_repl(session, &config, args.quiet).await
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("stax_cli=debug,stax_core=debug")
        } else {
            EnvFilter::new("stax_cli=warn,stax_core=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<StaxConfig> {
    let mut config = if let Some(path) = &args.config {
        StaxConfig::from_file(path)?
    } else {
        StaxConfig::load_default()?
    };

    if let Some(mode) = &args.mode {
        config.mode = mode.clone();
    }
    if let Some(addr) = &args.listen {
        config.listen = Some(addr.clone());
    }

    Ok(config)
}

async fn execute_line(session: &mut Session, line: &str) {
    info!("Executing command: {}", line);
    if let CommandResult::Output(text) = commands::dispatch(session, line).await {
        println!("{}", text);
    }
}

async fn execute_file(session: &mut Session, path: &Path) -> Result<()> {
    info!("Executing file: {}", path.display());

    let outcome = session
        .run_file(path)
        .await
        .with_context(|| format!("cannot run {}", path.display()))?;

    print!("{}", session.render(&outcome.tables));
    for failure in &outcome.failures {
        eprintln!("ERROR (statement {}): {}", failure.index + 1, failure.error);
    }
    Ok(())
}

async fn serve(session: Session, addr: &str) -> Result<()> {
    let server = LineServer::bind(addr, session)
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;
    println!("Serving remote sessions on {} (Ctrl+C to stop)", server.local_addr()?);

    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    Ok(())
}

async fn run_repl(session: Session, config: &StaxConfig, quiet: bool) -> Result<()> {
    let mut repl = Repl::new(session, config)?;

    if !quiet {
        repl.print_banner();
    }

    repl.run().await
}
