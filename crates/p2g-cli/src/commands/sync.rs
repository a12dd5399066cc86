use p2g_core::config::AppConfig;
use p2g_core::pipeline::command_sync_service;
use p2g_core::SyncResult;

use crate::commands::common::{format_sync_summary, open_store};
use crate::error::CliError;

pub async fn run_sync(
    config: &AppConfig,
    num_workouts: Option<u32>,
    as_json: bool,
) -> Result<SyncResult, CliError> {
    let store = open_store(config).await?;
    let service = command_sync_service(config, store)?;

    let result = service
        .run_sync(num_workouts.unwrap_or(config.default_num_workouts))
        .await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in format_sync_summary(&result) {
            println!("{line}");
        }
    }

    if let Some(stage) = result.failed_stage() {
        return Err(CliError::SyncFailed(stage));
    }
    Ok(result)
}
