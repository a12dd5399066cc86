use p2g_core::config::AppConfig;
use p2g_core::db::SyncStatusStore;
use p2g_core::SyncStatus;

use crate::commands::common::{format_status_lines, open_store};
use crate::error::CliError;

pub async fn run_status(config: &AppConfig, as_json: bool) -> Result<SyncStatus, CliError> {
    let status = open_store(config).await?.read_status().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(status)
}
