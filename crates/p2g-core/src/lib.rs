//! p2g-core - Core library for p2g
//!
//! This crate contains the sync orchestration pipeline (download, convert,
//! upload), the persisted sync status store, and the command-backed
//! collaborators used by the API and CLI front ends.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{SyncFailure, SyncResult, SyncStage, SyncStatus};
pub use sync::{StageError, SyncService, UploadError};
