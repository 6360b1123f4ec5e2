// Second pass of a report: fold per-identity accumulators into summary buckets.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::accumulator::UsageAccumulator;
use crate::models::{Counter, SummaryKey, UsageReport, UsageSummary};

#[derive(Debug, Default)]
pub struct SummaryAggregator {
    buckets: BTreeMap<SummaryKey, UsageSummary>,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one identity's usage to the bucket for its attributes.
    ///
    /// Every identity creates its bucket and is counted under its resource
    /// type. One whose samples lie entirely before or after the period adds
    /// no usage and no seconds. Negative deltas (counter went backwards) are
    /// clamped to zero so one bad sample cannot skew a fleet-wide sum.
    pub fn fold(&mut self, acc: &UsageAccumulator) {
        let attrs = acc.attributes();
        let summary = self.buckets.entry(SummaryKey::from(attrs)).or_default();
        if acc.truncated_interval().duration_ms() < 0 {
            debug!(
                identity = %attrs.identity,
                first_ms = acc.first_snapshot().timestamp_ms,
                last_ms = acc.last_snapshot().timestamp_ms,
                "samples do not overlap period; counted with zero usage"
            );
            summary.add_type_seconds(&attrs.resource_type, 0);
            return;
        }

        summary.add_disk_io_megs(clamped(acc, Counter::DiskIo));
        summary.add_network_io_megs(clamped(acc, Counter::NetworkIo));
        summary.add_type_seconds(&attrs.resource_type, acc.duration_secs());
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn finish(self) -> UsageReport {
        self.buckets
    }
}

fn clamped(acc: &UsageAccumulator, counter: Counter) -> i64 {
    let delta = acc.extrapolated_delta(counter);
    if delta < 0 {
        warn!(
            identity = %acc.attributes().identity,
            counter = counter.name(),
            delta,
            first_ms = acc.first_snapshot().timestamp_ms,
            last_ms = acc.last_snapshot().timestamp_ms,
            "negative usage delta clamped to zero"
        );
        return 0;
    }
    delta
}

/// Folds every accumulator and returns the completed report.
pub fn summarize<'a, I>(accumulators: I) -> UsageReport
where
    I: IntoIterator<Item = &'a UsageAccumulator>,
{
    let mut aggregator = SummaryAggregator::new();
    for acc in accumulators {
        aggregator.fold(acc);
    }
    aggregator.finish()
}
