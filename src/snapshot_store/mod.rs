// Query contract the reporting core needs from persistent storage.
// Each method is one logical unit: it runs in its own transaction and either
// completes or rolls back and returns a StoreError.

mod sqlite;

pub use sqlite::SqliteSnapshotStore;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{EntityAttributes, Snapshot};

/// Rows removed by one purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeCounts {
    pub snapshots: u64,
    pub attributes: u64,
}

pub trait SnapshotStore: Send + Sync {
    /// All attribute/snapshot pairs joined on identity with
    /// `after_ms < timestamp_ms < before_ms`, ordered by identity then timestamp.
    fn attributes_with_snapshots(
        &self,
        after_ms: i64,
        before_ms: i64,
    ) -> impl Future<Output = Result<Vec<(EntityAttributes, Snapshot)>, StoreError>> + Send;

    /// Latest snapshot timestamp (any identity) with `start_ms < timestamp_ms < end_ms`.
    fn latest_snapshot_in_window(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Deletes snapshots with `timestamp_ms < cutoff_ms`, then attributes left
    /// without any snapshot. Both steps commit together or not at all.
    fn purge_older_than(
        &self,
        cutoff_ms: i64,
    ) -> impl Future<Output = Result<PurgeCounts, StoreError>> + Send;

    /// Reclaims space after purges. No-op unless the backend needs it.
    fn compact(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Ok(()) }
    }
}
