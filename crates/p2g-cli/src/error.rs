use p2g_core::config::ConfigError;
use p2g_core::SyncStage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] p2g_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Sync failed during the {0} stage")]
    SyncFailed(SyncStage),
}
