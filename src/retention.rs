// Retention: purge snapshots older than a cutoff, then orphaned entities.
// The background worker purges on a fixed interval and reclaims space on a
// configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::snapshot_store::{PurgeCounts, SnapshotStore};
use crate::usage_log::UsageLog;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Deletes snapshots with `timestamp_ms < cutoff_ms` and the entities they
/// leave behind, in one store transaction.
pub async fn purge_older_than<S: SnapshotStore>(
    store: &S,
    cutoff_ms: i64,
) -> Result<PurgeCounts, StoreError> {
    info!(earlier_than_ms = cutoff_ms, "purging usage log");
    let counts = store.purge_older_than(cutoff_ms).await?;
    info!(
        snapshots_deleted = counts.snapshots,
        attributes_deleted = counts.attributes,
        "purge complete"
    );
    Ok(counts)
}

/// Cutoff that keeps the last `retention_days` of samples as of `now_ms`.
pub fn retention_cutoff(now_ms: i64, retention_days: u32) -> i64 {
    now_ms.saturating_sub((retention_days as i64).saturating_mul(MS_PER_DAY))
}

/// Config for the retention worker.
#[derive(Debug, Clone)]
pub struct RetentionWorkerConfig {
    pub purge_interval_secs: u64,
    pub retention_days: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

/// Spawns the retention worker. Returns a join handle.
pub fn spawn<S>(log: Arc<UsageLog<S>>, config: RetentionWorkerConfig) -> tokio::task::JoinHandle<()>
where
    S: SnapshotStore + 'static,
{
    tokio::spawn(async move {
        run(log, config).await;
    })
}

#[instrument(skip(log), fields(interval_secs = config.purge_interval_secs))]
async fn run<S: SnapshotStore>(log: Arc<UsageLog<S>>, config: RetentionWorkerConfig) {
    let mut purge_interval = tokio::time::interval(Duration::from_secs(config.purge_interval_secs));
    purge_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

    loop {
        tokio::select! {
            _ = purge_interval.tick() => {
                if let Err(e) = run_one_pass(&log, &config).await {
                    warn!(error = %e, "retention pass failed");
                }
            }
            _ = vacuum_rx.recv() => {
                if let Err(e) = log.store().compact().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }
}

/// Sends a message on `tx` at each VACUUM time (cron or fixed interval). Uses local time for cron.
async fn vacuum_scheduler(config: RetentionWorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.vacuum_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            if let Some(next) = schedule.after(&now).next() {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let interval = Duration::from_secs(config.vacuum_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

/// One retention pass: purge everything older than `retention_days` from now.
pub async fn run_one_pass<S: SnapshotStore>(
    log: &UsageLog<S>,
    config: &RetentionWorkerConfig,
) -> anyhow::Result<PurgeCounts> {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64;
    let cutoff = retention_cutoff(now_ms, config.retention_days);
    let counts = log.purge_log(cutoff).await?;
    Ok(counts)
}
