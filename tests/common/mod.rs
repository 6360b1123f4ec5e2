// Shared test helpers: row builders, a throwaway SQLite store and an in-memory store

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use usagelog::error::StoreError;
use usagelog::models::{EntityAttributes, Snapshot};
use usagelog::snapshot_store::{PurgeCounts, SnapshotStore, SqliteSnapshotStore};

pub const HOUR_MS: i64 = 3_600_000;

pub fn attrs(identity: &str, resource_type: &str, owner_id: &str) -> EntityAttributes {
    EntityAttributes {
        identity: identity.into(),
        resource_id: format!("i-{}", identity),
        resource_type: resource_type.into(),
        owner_id: owner_id.into(),
        account_id: "acct-1".into(),
        cluster_name: "cluster-a".into(),
        availability_zone: "zone-1".into(),
    }
}

pub fn snap(identity: &str, timestamp_ms: i64, disk: i64, net: i64) -> Snapshot {
    Snapshot {
        identity: identity.into(),
        timestamp_ms,
        cumulative_disk_io_megs: disk,
        cumulative_network_io_megs: net,
    }
}

/// Initialized SQLite store in a temp dir. Keep the TempDir alive for the test.
pub async fn sqlite_store() -> (TempDir, SqliteSnapshotStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("usage.db");
    let store = SqliteSnapshotStore::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    store.init().await.unwrap();
    (dir, store)
}

/// In-memory store that counts queries and can fail a chosen locator query.
#[derive(Default)]
pub struct MemoryStore {
    pub attributes: Mutex<Vec<EntityAttributes>>,
    pub snapshots: Mutex<Vec<Snapshot>>,
    pub window_queries: AtomicUsize,
    pub fetch_queries: AtomicUsize,
    /// 1-based index of the locator query that returns an error.
    pub fail_window_query: Option<usize>,
    /// Return joined rows newest-first to exercise facade-side ordering.
    pub reverse_rows: bool,
    pub active_purges: AtomicUsize,
    pub max_active_purges: AtomicUsize,
}

impl MemoryStore {
    pub fn with_rows(attributes: Vec<EntityAttributes>, snapshots: Vec<Snapshot>) -> Self {
        Self {
            attributes: Mutex::new(attributes),
            snapshots: Mutex::new(snapshots),
            ..Self::default()
        }
    }

    pub fn window_queries(&self) -> usize {
        self.window_queries.load(Ordering::SeqCst)
    }

    pub fn fetch_queries(&self) -> usize {
        self.fetch_queries.load(Ordering::SeqCst)
    }

    /// Highest number of purges seen running at the same time.
    pub fn max_active_purges(&self) -> usize {
        self.max_active_purges.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemoryStore {
    async fn attributes_with_snapshots(
        &self,
        after_ms: i64,
        before_ms: i64,
    ) -> Result<Vec<(EntityAttributes, Snapshot)>, StoreError> {
        self.fetch_queries.fetch_add(1, Ordering::SeqCst);
        let attributes = self.attributes.lock().unwrap();
        let snapshots = self.snapshots.lock().unwrap();
        let mut rows: Vec<(EntityAttributes, Snapshot)> = snapshots
            .iter()
            .filter(|s| s.timestamp_ms > after_ms && s.timestamp_ms < before_ms)
            .filter_map(|s| {
                attributes
                    .iter()
                    .find(|a| a.identity == s.identity)
                    .map(|a| (a.clone(), s.clone()))
            })
            .collect();
        rows.sort_by(|(a, s), (b, t)| {
            a.identity
                .cmp(&b.identity)
                .then(s.timestamp_ms.cmp(&t.timestamp_ms))
        });
        if self.reverse_rows {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn latest_snapshot_in_window(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Option<i64>, StoreError> {
        let n = self.window_queries.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_window_query == Some(n) {
            return Err(StoreError::Unavailable(format!("window query {} failed", n)));
        }
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .iter()
            .map(|s| s.timestamp_ms)
            .filter(|&ts| ts > start_ms && ts < end_ms)
            .max())
    }

    async fn purge_older_than(&self, cutoff_ms: i64) -> Result<PurgeCounts, StoreError> {
        let active = self.active_purges.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_purges.fetch_max(active, Ordering::SeqCst);

        let snapshots_deleted = {
            let mut snapshots = self.snapshots.lock().unwrap();
            let before = snapshots.len();
            snapshots.retain(|s| s.timestamp_ms >= cutoff_ms);
            before - snapshots.len()
        };
        // Give an unserialized second purge the chance to interleave here.
        tokio::task::yield_now().await;
        let attributes_deleted = {
            let snapshots = self.snapshots.lock().unwrap();
            let mut attributes = self.attributes.lock().unwrap();
            let before = attributes.len();
            attributes.retain(|a| snapshots.iter().any(|s| s.identity == a.identity));
            before - attributes.len()
        };

        self.active_purges.fetch_sub(1, Ordering::SeqCst);
        Ok(PurgeCounts {
            snapshots: snapshots_deleted as u64,
            attributes: attributes_deleted as u64,
        })
    }
}
