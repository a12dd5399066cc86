//! p2g CLI - run workout syncs from the terminal
//!
//! Wraps the same pipeline the API serves, reading its configuration from
//! the environment (or a `.env` file).

mod cli;
mod commands;
mod error;

use clap::Parser;
use p2g_core::config::AppConfig;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("p2g=info".parse().expect("valid directive"))
                .add_directive("p2g_core=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { num_workouts, json } => {
            let config = load_config(cli.db_path)?;
            run_sync(&config, num_workouts, json).await?;
        }
        Commands::Status { json } => {
            let config = load_config(cli.db_path)?;
            run_status(&config, json).await?;
        }
    }

    Ok(())
}

fn load_config(db_path: Option<std::path::PathBuf>) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::from_env()?;
    config.db_path = resolve_db_path(db_path, &config);
    tracing::debug!(db_path = %config.db_path.display(), "Loaded configuration");
    Ok(config)
}
