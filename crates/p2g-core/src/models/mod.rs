//! Data models for p2g

mod sync_result;
mod sync_status;

pub use sync_result::{SyncFailure, SyncResult, SyncStage};
pub use sync_status::SyncStatus;
