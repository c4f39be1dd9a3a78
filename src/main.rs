//! Operator options - startup configuration resolver
//!
//! Entry point that resolves, logs and installs the operator's options.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use clap::{CommandFactory, FromArgMatches, Parser};
use operator_options::observability::{init_tracing, TracingConfig};
use operator_options::options::{flags, Registry, StdEnv};
use operator_options::{Error, Options, Result};

/// Operator options - resolve startup configuration from flags and environment
#[derive(Parser, Debug)]
#[command(name = "operator-options")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(Error::Flags(err)) => err.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    let matches = flags::augment_args(Cli::command(), Registry::standard()).try_get_matches()?;
    let cli = Cli::from_arg_matches(&matches)?;

    init_tracing(&TracingConfig {
        level: cli.log_level,
        json: cli.log_json,
    });

    tracing::info!(
        "Operator options v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let options = Options::from_matches(&matches, &StdEnv)?;
    tracing::info!(options = %serde_json::to_string(&options)?, "Options resolved");

    let options = options
        .install()
        .map_err(|_| Error::internal("options were already installed"))?;

    tracing::info!(
        "Cluster {} ready, isolated VPC: {}, interruption handling: {}",
        options.cluster_name(),
        options.isolated_vpc(),
        options.interruption_handling_enabled()
    );
    Ok(())
}
