// Rows owned by the external sampler: counter snapshots and the attributes of
// the entity they describe.

use serde::{Deserialize, Serialize};

/// One sample of cumulative, non-decreasing counters for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub identity: String,
    pub timestamp_ms: i64,
    pub cumulative_disk_io_megs: i64,
    pub cumulative_network_io_megs: i64,
}

/// Selects which cumulative counter of a snapshot to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    DiskIo,
    NetworkIo,
}

impl Counter {
    pub fn name(self) -> &'static str {
        match self {
            Counter::DiskIo => "disk_io",
            Counter::NetworkIo => "network_io",
        }
    }
}

impl Snapshot {
    pub fn counter(&self, counter: Counter) -> i64 {
        match counter {
            Counter::DiskIo => self.cumulative_disk_io_megs,
            Counter::NetworkIo => self.cumulative_network_io_megs,
        }
    }
}

/// Descriptive record for a metered resource. Written once when the resource is
/// first observed; orphaned once its last snapshot is purged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAttributes {
    pub identity: String,
    pub resource_id: String,
    /// Classification used for per-type elapsed time (e.g. "m1.small").
    pub resource_type: String,
    pub owner_id: String,
    pub account_id: String,
    pub cluster_name: String,
    pub availability_zone: String,
}
