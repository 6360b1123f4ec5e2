// Per-identity folding of ordered snapshots into usage bounded to a period.
//
// Counters are sampled, not continuously recorded, so the usage that falls
// exactly inside the period boundaries is unknowable. The delta between the
// first and last samples in range is scaled linearly (constant-rate
// assumption) for the part of the sampled interval lying outside the period.
// This introduces small errors at period boundaries.

use std::collections::HashMap;

use crate::models::{Counter, EntityAttributes, Period, Snapshot};

const MS_PER_SEC: i64 = 1000;

#[derive(Debug, Clone)]
pub struct UsageAccumulator {
    attributes: EntityAttributes,
    first: Snapshot,
    last: Snapshot,
    period: Period,
}

impl UsageAccumulator {
    /// Starts from the earliest in-range snapshot. Until `update` is called the
    /// last snapshot is the first one, so every delta is zero.
    pub fn new(attributes: EntityAttributes, snapshot: Snapshot, period: Period) -> Self {
        Self {
            attributes,
            last: snapshot.clone(),
            first: snapshot,
            period,
        }
    }

    /// Rows arrive in ascending timestamp order; the final call holds the latest sample.
    pub fn update(&mut self, snapshot: Snapshot) {
        self.last = snapshot;
    }

    pub fn attributes(&self) -> &EntityAttributes {
        &self.attributes
    }

    pub fn first_snapshot(&self) -> &Snapshot {
        &self.first
    }

    pub fn last_snapshot(&self) -> &Snapshot {
        &self.last
    }

    /// Overlap of the period and the observed sample interval. Can be empty or
    /// inverted when the samples sit entirely on one side of the period.
    pub fn truncated_interval(&self) -> Period {
        Period::new(
            self.period.beginning_ms.max(self.first.timestamp_ms),
            self.period.ending_ms.min(self.last.timestamp_ms),
        )
    }

    pub fn duration_secs(&self) -> i64 {
        self.truncated_interval().duration_ms() / MS_PER_SEC
    }

    /// Observed counter delta scaled down for the sampled time lying before the
    /// period beginning and after its end. The two corrections compound.
    /// Truncated toward zero and saturated to the i64 range; may be negative if
    /// the counter went backwards.
    pub fn extrapolated_delta(&self, counter: Counter) -> i64 {
        // Counters and timestamps may span the whole i64 range; subtract in f64.
        let duration = self.period.ending_ms as f64 - self.period.beginning_ms as f64;
        let mut result =
            self.last.counter(counter) as f64 - self.first.counter(counter) as f64;
        if self.first.timestamp_ms < self.period.beginning_ms {
            let gap = self.period.beginning_ms as f64 - self.first.timestamp_ms as f64;
            result *= 1.0 - gap / duration;
        }
        if self.last.timestamp_ms > self.period.ending_ms {
            let gap = self.last.timestamp_ms as f64 - self.period.ending_ms as f64;
            result *= 1.0 - gap / duration;
        }
        result as i64
    }

    pub fn disk_io_megs(&self) -> i64 {
        self.extrapolated_delta(Counter::DiskIo)
    }

    pub fn network_io_megs(&self) -> i64 {
        self.extrapolated_delta(Counter::NetworkIo)
    }
}

/// First pass of a report: one accumulator per identity, in row order.
/// Rows for an identity must be in ascending timestamp order.
pub fn accumulate<I>(rows: I, period: Period) -> HashMap<String, UsageAccumulator>
where
    I: IntoIterator<Item = (EntityAttributes, Snapshot)>,
{
    let mut by_identity: HashMap<String, UsageAccumulator> = HashMap::new();
    for (attributes, snapshot) in rows {
        match by_identity.get_mut(&attributes.identity) {
            Some(acc) => acc.update(snapshot),
            None => {
                by_identity.insert(
                    attributes.identity.clone(),
                    UsageAccumulator::new(attributes, snapshot, period),
                );
            }
        }
    }
    by_identity
}
