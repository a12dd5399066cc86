//! Persisted sync status model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of when the pipeline last ran.
///
/// Both timestamps are absent until the first fully successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Most recent sync attempt
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Most recent run in which download, convert, and upload all succeeded
    pub last_successful_sync_time: Option<DateTime<Utc>>,
}

impl SyncStatus {
    /// Stamp both timestamps with the same instant.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_sync_time = Some(at);
        self.last_successful_sync_time = Some(at);
    }

    /// Whether a successful run has ever been recorded.
    pub const fn has_synced(&self) -> bool {
        self.last_successful_sync_time.is_some()
    }
}
