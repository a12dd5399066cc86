use std::path::PathBuf;

use clap::{Parser, Subcommand};
use p2g_core::config::MAX_NUM_WORKOUTS;

#[derive(Parser)]
#[command(name = "p2g")]
#[command(about = "Download, convert and upload workouts from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the sync status database (overrides P2G_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the download, convert and upload pipeline once
    Sync {
        /// Number of recent workouts to download
        #[arg(
            short = 'n',
            long = "num-workouts",
            value_name = "COUNT",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_NUM_WORKOUTS))
        )]
        num_workouts: Option<u32>,
        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show when the last sync ran
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

