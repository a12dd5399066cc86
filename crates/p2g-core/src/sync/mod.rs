//! Sync orchestration.
//!
//! [`SyncService`] runs download, convert, and upload in order against
//! injected collaborators and records the outcome in a [`SyncResult`]. The
//! collaborator capabilities are defined here; concrete command-backed
//! implementations live in [`crate::pipeline`].
//!
//! [`SyncResult`]: crate::models::SyncResult

mod service;

use thiserror::Error;

pub use crate::db::SyncStatusStore;
pub use service::SyncService;

/// Failure reported by the download stage or a converter.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("{0}")]
    Other(String),
}

/// Failure reported by the upload stage.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload service (or the tool talking to it) rejected the files.
    /// The converted files are still on disk for a manual upload.
    #[error("Upload rejected ({status}): {detail}")]
    Rejected { status: String, detail: String },
    /// Anything else that went wrong while uploading
    #[error(transparent)]
    Unexpected(#[from] StageError),
}

impl UploadError {
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Fetches the latest workouts from the source platform (async)
#[allow(async_fn_in_trait)]
pub trait WorkoutDownloader {
    async fn download_latest(&self, count: u32) -> Result<(), StageError>;
}

/// Converts downloaded workouts into upload-ready files.
///
/// Converters run one after another on the calling task and may block.
pub trait WorkoutConverter {
    /// Short name used in log output
    fn name(&self) -> &str;

    fn convert(&self) -> Result<(), StageError>;
}

/// Pushes converted files to the destination platform (async)
#[allow(async_fn_in_trait)]
pub trait WorkoutUploader {
    async fn upload_all(&self) -> Result<(), UploadError>;
}

/// Converter collection entry
pub type BoxedConverter = Box<dyn WorkoutConverter + Send + Sync>;
