//! # enx CLI entry point
//!
//! Parses arguments, initialises tracing, and dispatches to the subcommand
//! handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use enx_cli::assemble::{run_assemble, AssembleArgs};
use enx_cli::keygen::{run_keygen, KeygenArgs};
use enx_cli::retention::{run_retention, RetentionArgs};

/// Exposure notification distribution server.
///
/// Assembles the signed distribution bundle, applies the key retention
/// policy, and generates signing keys.
#[derive(Parser, Debug)]
#[command(name = "enx", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch remote content, read diagnosis keys, and write the signed bundle.
    Assemble(AssembleArgs),

    /// Delete diagnosis keys older than the retention period.
    Retention(RetentionArgs),

    /// Generate an Ed25519 signing key.
    Keygen(KeygenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let result = match cli.command {
        Commands::Assemble(args) => run_assemble(&args),
        Commands::Retention(args) => run_retention(&args),
        Commands::Keygen(args) => run_keygen(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
