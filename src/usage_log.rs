// Reporting entry point: usage summary for a period, and purging of old rows.

use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::accumulator;
use crate::aggregator::SummaryAggregator;
use crate::error::ReportError;
use crate::locator;
use crate::models::{Period, UsageReport};
use crate::retention;
use crate::snapshot_store::{PurgeCounts, SnapshotStore};

/// How far past the anchor and the period end the main query reaches.
///
/// The upper bound is `ending + max((beginning - anchor) * margin_multiplier, min_margin_ms)`,
/// a heuristic meant to catch at least one snapshot after the period end. It can
/// under-fetch when the sampling cadence is irregular; `min_margin_ms` puts a
/// floor under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub margin_multiplier: i64,
    pub min_margin_ms: i64,
    /// Fetch the anchor snapshot itself, not only rows strictly after it.
    pub include_anchor: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            margin_multiplier: 2,
            min_margin_ms: 0,
            include_anchor: false,
        }
    }
}

/// Exclusive timestamp bounds of the main query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub after_ms: i64,
    pub before_ms: i64,
}

impl FetchPolicy {
    /// `anchor` of `None` means no earlier snapshot: fetch from the epoch.
    pub fn fetch_window(&self, period: &Period, anchor: Option<i64>) -> FetchWindow {
        let anchor_ms = anchor.unwrap_or(0);
        let margin = period
            .beginning_ms
            .saturating_sub(anchor_ms)
            .saturating_mul(self.margin_multiplier)
            .max(self.min_margin_ms);
        let after_ms = if self.include_anchor {
            anchor_ms.saturating_sub(1)
        } else {
            anchor_ms
        };
        FetchWindow {
            after_ms,
            before_ms: period.ending_ms.saturating_add(margin),
        }
    }
}

/// Reporting facade over a snapshot store.
pub struct UsageLog<S> {
    store: S,
    policy: FetchPolicy,
    purge_lock: Mutex<()>,
}

impl<S: SnapshotStore> UsageLog<S> {
    pub fn new(store: S, policy: FetchPolicy) -> Self {
        Self {
            store,
            policy,
            purge_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Usage of every entity seen in `period`, grouped by summary key.
    /// Either the complete report or an error; never a partial map.
    #[instrument(skip(self, period), fields(operation = "get_usage_summary", period = %period))]
    pub async fn get_usage_summary(&self, period: Period) -> Result<UsageReport, ReportError> {
        period.validate()?;

        let anchor = locator::find_latest_before(&self.store, period.beginning_ms)
            .await
            .inspect_err(|e| error!(error = %e, "locating anchor snapshot failed"))?;
        let window = self.policy.fetch_window(&period, anchor);

        let mut rows = self
            .store
            .attributes_with_snapshots(window.after_ms, window.before_ms)
            .await
            .inspect_err(|e| error!(error = %e, "fetching snapshots failed"))?;
        // Folding relies on ascending timestamps per identity.
        rows.sort_by(|(a, s), (b, t)| {
            a.identity
                .cmp(&b.identity)
                .then(s.timestamp_ms.cmp(&t.timestamp_ms))
        });
        let rows_count = rows.len();

        let accumulators = accumulator::accumulate(rows, period);
        let mut aggregator = SummaryAggregator::new();
        for acc in accumulators.values() {
            aggregator.fold(acc);
        }

        info!(
            anchor_ms = anchor,
            after_ms = window.after_ms,
            before_ms = window.before_ms,
            rows = rows_count,
            identities = accumulators.len(),
            buckets = aggregator.len(),
            "usage summary built"
        );
        Ok(aggregator.finish())
    }

    /// Permanently deletes snapshots older than `earlier_than_ms` and entities
    /// left without snapshots. Purges are serialized; each is all-or-nothing.
    #[instrument(skip(self), fields(operation = "purge_log"))]
    pub async fn purge_log(&self, earlier_than_ms: i64) -> Result<PurgeCounts, ReportError> {
        let _guard = self.purge_lock.lock().await;
        let counts = retention::purge_older_than(&self.store, earlier_than_ms)
            .await
            .inspect_err(|e| error!(error = %e, "purge failed, rolled back"))?;
        Ok(counts)
    }
}
