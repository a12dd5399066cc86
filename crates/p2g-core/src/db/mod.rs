//! Database layer for p2g

mod connection;
mod migrations;
mod sync_status_repository;

pub use connection::Database;
pub use sync_status_repository::{LibSqlSyncStatusRepository, SyncStatusStore};
