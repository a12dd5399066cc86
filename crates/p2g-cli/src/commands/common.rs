use std::path::PathBuf;

use p2g_core::config::AppConfig;
use p2g_core::db::LibSqlSyncStatusRepository;
use p2g_core::util::format_optional_time;
use p2g_core::{SyncResult, SyncStage, SyncStatus};

use crate::error::CliError;

/// `--db-path` wins over the configured path.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &AppConfig) -> PathBuf {
    cli_db_path.unwrap_or_else(|| config.db_path.clone())
}

pub async fn open_store(config: &AppConfig) -> Result<LibSqlSyncStatusRepository, CliError> {
    Ok(LibSqlSyncStatusRepository::open(&config.db_path).await?)
}

pub fn format_sync_summary(result: &SyncResult) -> Vec<String> {
    let mut lines = SyncStage::ALL
        .into_iter()
        .map(|stage| {
            let outcome = match result.stage_outcome(stage) {
                Some(true) => "ok",
                Some(false) => "failed",
                None => "skipped",
            };
            format!("{:<10} {outcome}", stage.as_str())
        })
        .collect::<Vec<_>>();

    lines.extend(
        result
            .errors
            .iter()
            .map(|failure| format!("error: {}", failure.message)),
    );
    lines.push(if result.overall_success {
        "Sync completed".to_string()
    } else {
        "Sync failed".to_string()
    });
    lines
}

pub fn format_status_lines(status: &SyncStatus) -> Vec<String> {
    vec![
        format!(
            "Last sync:            {}",
            format_optional_time(status.last_sync_time)
        ),
        format!(
            "Last successful sync: {}",
            format_optional_time(status.last_successful_sync_time)
        ),
    ]
}
