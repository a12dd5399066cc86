//! Wiring the sync service to external tools.
//!
//! Each stage is an external command configured through the environment
//! (see [`crate::config`]). Commands receive the output directory in
//! `P2G_OUTPUT_DIRECTORY`; the download command also gets the requested
//! workout count in `P2G_NUM_WORKOUTS`.

mod command;

pub use command::{
    CommandConverter, CommandDownloader, CommandSpec, CommandUploader, NUM_WORKOUTS_VAR,
};

use crate::config::{AppConfig, ConfigError, DOWNLOAD_COMMAND_VAR, UPLOAD_COMMAND_VAR};
use crate::sync::{BoxedConverter, SyncService, SyncStatusStore};

/// Sync service backed by external commands.
///
/// Converters run through `std::process` on the task driving
/// [`SyncService::run_sync`], so a slow converter holds that runtime worker
/// until it exits.
pub type CommandSyncService<S> = SyncService<CommandDownloader, CommandUploader, S>;

/// Build a [`CommandSyncService`] from configuration.
pub fn command_sync_service<S: SyncStatusStore>(
    config: &AppConfig,
    store: S,
) -> Result<CommandSyncService<S>, ConfigError> {
    let download = config
        .download_command
        .clone()
        .ok_or(ConfigError::MissingVar(DOWNLOAD_COMMAND_VAR))?;
    let upload = config
        .upload_command
        .clone()
        .ok_or(ConfigError::MissingVar(UPLOAD_COMMAND_VAR))?;

    if config.convert_commands.is_empty() {
        tracing::warn!("No converters configured, the convert stage will be a no-op");
    }

    let output_directory = &config.output_directory;
    let converters = config
        .convert_commands
        .iter()
        .cloned()
        .map(|command| {
            Box::new(CommandConverter::new(command, output_directory)) as BoxedConverter
        })
        .collect();

    Ok(SyncService::new(
        CommandDownloader::new(download, output_directory),
        converters,
        CommandUploader::new(upload, output_directory),
        store,
        output_directory,
    ))
}
