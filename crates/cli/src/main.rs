//! tabsweep CLI: the main entry point.
//!
//! Commands:
//! - `status`: show the effective settings and where they came from
//! - `config`: print the effective configuration as TOML
//! - `simulate`: run the engine against a scenario file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tabsweep",
    about = "tabsweep: archive idle tabs, keep tab groups first",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective settings
    Status,

    /// Print the effective configuration
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },

    /// Run a startup scan over a scenario, advance the clock, scan again
    Simulate {
        /// Scenario file (TOML) describing windows and tabs
        scenario: PathBuf,

        /// Minutes to advance the clock between the two scans
        #[arg(short, long, default_value_t = 0)]
        advance_minutes: i64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Status => commands::status::run().await?,
        Commands::Config { default } => commands::config_cmd::run(default).await?,
        Commands::Simulate {
            scenario,
            advance_minutes,
            json,
        } => commands::simulate::run(&scenario, advance_minutes, json).await?,
    }

    Ok(())
}
