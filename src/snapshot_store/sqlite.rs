// SQLite snapshot store. Uses sqlx for async + connection pooling.
// Two tables: entity_attributes (one row per identity) and usage_snapshot
// (one row per sample). The sampler writes both; reporting only reads.

use std::path::Path;
use std::str::FromStr;

use futures_util::TryStreamExt;
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use tracing::{debug, instrument};

use super::{PurgeCounts, SnapshotStore};
use crate::error::StoreError;
use crate::models::{EntityAttributes, Snapshot};

pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entity_attributes (
                identity TEXT PRIMARY KEY,
                resource_id TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                cluster_name TEXT NOT NULL,
                availability_zone TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_snapshot (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identity TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                cumulative_disk_io_megs INTEGER NOT NULL,
                cumulative_network_io_megs INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_usage_snapshot_timestamp ON usage_snapshot(timestamp_ms)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_usage_snapshot_identity ON usage_snapshot(identity, timestamp_ms)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records entities. An identity that already exists keeps its original attributes.
    #[instrument(skip(self, attributes), fields(repo = "snapshot_store", operation = "save_attributes", attributes_count = attributes.len()))]
    pub async fn save_attributes(&self, attributes: &[EntityAttributes]) -> Result<(), StoreError> {
        if attributes.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for a in attributes {
            sqlx::query(
                "INSERT OR IGNORE INTO entity_attributes (identity, resource_id, resource_type, owner_id, account_id, cluster_name, availability_zone) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&a.identity)
            .bind(&a.resource_id)
            .bind(&a.resource_type)
            .bind(&a.owner_id)
            .bind(&a.account_id)
            .bind(&a.cluster_name)
            .bind(&a.availability_zone)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, snapshots), fields(repo = "snapshot_store", operation = "save_snapshots", snapshots_count = snapshots.len()))]
    pub async fn save_snapshots(&self, snapshots: &[Snapshot]) -> Result<(), StoreError> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            sqlx::query(
                "INSERT INTO usage_snapshot (identity, timestamp_ms, cumulative_disk_io_megs, cumulative_network_io_megs) VALUES ($1, $2, $3, $4)",
            )
            .bind(&s.identity)
            .bind(s.timestamp_ms)
            .bind(s.cumulative_disk_io_megs)
            .bind(s.cumulative_network_io_megs)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count_snapshots(&self) -> Result<i64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM usage_snapshot")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_attributes(&self) -> Result<i64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM entity_attributes")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Reclaim space after deletes (run periodically after purging).
    #[instrument(skip(self), fields(repo = "snapshot_store", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<(), StoreError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn parse_joined_row(row: &SqliteRow) -> Result<(EntityAttributes, Snapshot), StoreError> {
        let identity: String = row.try_get("identity")?;
        let attributes = EntityAttributes {
            identity: identity.clone(),
            resource_id: row.try_get("resource_id")?,
            resource_type: row.try_get("resource_type")?,
            owner_id: row.try_get("owner_id")?,
            account_id: row.try_get("account_id")?,
            cluster_name: row.try_get("cluster_name")?,
            availability_zone: row.try_get("availability_zone")?,
        };
        let snapshot = Snapshot {
            identity,
            timestamp_ms: row.try_get("timestamp_ms")?,
            cumulative_disk_io_megs: row.try_get("cumulative_disk_io_megs")?,
            cumulative_network_io_megs: row.try_get("cumulative_network_io_megs")?,
        };
        Ok((attributes, snapshot))
    }
}

/// Step 1 of a purge. Runs on the caller's transaction.
async fn delete_snapshots_older_than(
    conn: &mut SqliteConnection,
    cutoff_ms: i64,
) -> Result<u64, StoreError> {
    let r = sqlx::query("DELETE FROM usage_snapshot WHERE timestamp_ms < $1")
        .bind(cutoff_ms)
        .execute(conn)
        .await?;
    Ok(r.rows_affected())
}

/// Step 2 of a purge: attributes with no surviving snapshot.
async fn delete_orphaned_attributes(conn: &mut SqliteConnection) -> Result<u64, StoreError> {
    let r = sqlx::query(
        r#"
        DELETE FROM entity_attributes
        WHERE NOT EXISTS (
            SELECT 1 FROM usage_snapshot s WHERE s.identity = entity_attributes.identity
        )
        "#,
    )
    .execute(conn)
    .await?;
    Ok(r.rows_affected())
}

impl SnapshotStore for SqliteSnapshotStore {
    #[instrument(
        skip(self),
        fields(repo = "snapshot_store", operation = "attributes_with_snapshots")
    )]
    async fn attributes_with_snapshots(
        &self,
        after_ms: i64,
        before_ms: i64,
    ) -> Result<Vec<(EntityAttributes, Snapshot)>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut out = Vec::new();
        {
            let mut rows = sqlx::query(
                "SELECT a.identity, a.resource_id, a.resource_type, a.owner_id, a.account_id,
                        a.cluster_name, a.availability_zone,
                        s.timestamp_ms, s.cumulative_disk_io_megs, s.cumulative_network_io_megs
                 FROM entity_attributes a
                 JOIN usage_snapshot s ON a.identity = s.identity
                 WHERE s.timestamp_ms > $1 AND s.timestamp_ms < $2
                 ORDER BY a.identity ASC, s.timestamp_ms ASC",
            )
            .bind(after_ms)
            .bind(before_ms)
            .fetch(&mut *tx);

            while let Some(row) = rows.try_next().await? {
                out.push(Self::parse_joined_row(&row)?);
            }
        }
        tx.commit().await?;
        debug!(rows = out.len(), "fetched attributed snapshots");
        Ok(out)
    }

    async fn latest_snapshot_in_window(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Option<i64>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let latest = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(timestamp_ms) FROM usage_snapshot WHERE timestamp_ms > $1 AND timestamp_ms < $2",
        )
        .bind(start_ms)
        .bind(end_ms)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(latest)
    }

    #[instrument(skip(self), fields(repo = "snapshot_store", operation = "purge_older_than"))]
    async fn purge_older_than(&self, cutoff_ms: i64) -> Result<PurgeCounts, StoreError> {
        let mut tx = self.pool.begin().await?;
        let snapshots = delete_snapshots_older_than(&mut *tx, cutoff_ms).await?;
        let attributes = delete_orphaned_attributes(&mut *tx).await?;
        tx.commit().await?;
        Ok(PurgeCounts {
            snapshots,
            attributes,
        })
    }

    async fn compact(&self) -> Result<(), StoreError> {
        self.vacuum().await
    }
}
