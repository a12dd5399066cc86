//! Sync status repository implementation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::{Row, Value};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::SyncStatus;
use crate::util::datetime_from_millis;

/// Persistent store for the pipeline's [`SyncStatus`] (async)
#[allow(async_fn_in_trait)]
pub trait SyncStatusStore {
    /// Load the stored status, or the default when nothing has been written yet
    async fn read_status(&self) -> Result<SyncStatus>;

    /// Replace the stored status
    async fn write_status(&self, status: &SyncStatus) -> Result<()>;
}

impl<T: SyncStatusStore> SyncStatusStore for Arc<T> {
    async fn read_status(&self) -> Result<SyncStatus> {
        (**self).read_status().await
    }

    async fn write_status(&self, status: &SyncStatus) -> Result<()> {
        (**self).write_status(status).await
    }
}

/// libSQL implementation of `SyncStatusStore`
pub struct LibSqlSyncStatusRepository {
    db: Database,
}

impl LibSqlSyncStatusRepository {
    /// Create a new repository backed by the given database
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (or create) the database at `path` and wrap it
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }
}

impl SyncStatusStore for LibSqlSyncStatusRepository {
    async fn read_status(&self) -> Result<SyncStatus> {
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT last_sync_time, last_successful_sync_time FROM sync_status WHERE id = 1",
                (),
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(SyncStatus::default());
        };

        Ok(SyncStatus {
            last_sync_time: timestamp_column(&row, 0)?,
            last_successful_sync_time: timestamp_column(&row, 1)?,
        })
    }

    async fn write_status(&self, status: &SyncStatus) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT INTO sync_status (id, last_sync_time, last_successful_sync_time)
                 VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                    last_sync_time = excluded.last_sync_time,
                    last_successful_sync_time = excluded.last_successful_sync_time",
                libsql::params![
                    timestamp_value(status.last_sync_time),
                    timestamp_value(status.last_successful_sync_time)
                ],
            )
            .await?;
        Ok(())
    }
}

fn timestamp_column(row: &Row, index: i32) -> Result<Option<DateTime<Utc>>> {
    match row.get_value(index)? {
        Value::Null => Ok(None),
        Value::Integer(millis) => datetime_from_millis(millis).map(Some).ok_or_else(|| {
            Error::Database(format!("sync_status timestamp out of range: {millis}"))
        }),
        other => Err(Error::Database(format!(
            "unexpected sync_status column value: {other:?}"
        ))),
    }
}

fn timestamp_value(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |time| Value::Integer(time.timestamp_millis()))
}
