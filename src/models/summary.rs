// Report shapes: grouping key and per-bucket totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EntityAttributes;

/// Grouping dimensions of an entity. Entities with identical dimensions share
/// a summary bucket; identity, resource id and type are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryKey {
    pub owner_id: String,
    pub account_id: String,
    pub cluster_name: String,
    pub availability_zone: String,
}

impl From<&EntityAttributes> for SummaryKey {
    fn from(attrs: &EntityAttributes) -> Self {
        Self {
            owner_id: attrs.owner_id.clone(),
            account_id: attrs.account_id.clone(),
            cluster_name: attrs.cluster_name.clone(),
            availability_zone: attrs.availability_zone.clone(),
        }
    }
}

/// Running totals for one summary bucket. Built per report, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub disk_io_megs: i64,
    pub network_io_megs: i64,
    /// Elapsed seconds inside the period, by resource type.
    pub per_type_seconds: BTreeMap<String, i64>,
    /// Number of entities that contributed, by resource type.
    pub per_type_count: BTreeMap<String, u64>,
}

impl UsageSummary {
    pub fn add_disk_io_megs(&mut self, megs: i64) {
        self.disk_io_megs = self.disk_io_megs.saturating_add(megs);
    }

    pub fn add_network_io_megs(&mut self, megs: i64) {
        self.network_io_megs = self.network_io_megs.saturating_add(megs);
    }

    /// Counts one entity of `resource_type` and adds its elapsed seconds.
    pub fn add_type_seconds(&mut self, resource_type: &str, secs: i64) {
        let total = self
            .per_type_seconds
            .entry(resource_type.to_string())
            .or_insert(0);
        *total = total.saturating_add(secs);
        *self
            .per_type_count
            .entry(resource_type.to_string())
            .or_insert(0) += 1;
    }
}

/// Completed report: one summary per key. Never handed out partially filled.
pub type UsageReport = BTreeMap<SummaryKey, UsageSummary>;

/// Flattened report row for JSON output (struct keys cannot be JSON map keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRow {
    #[serde(flatten)]
    pub key: SummaryKey,
    #[serde(flatten)]
    pub summary: UsageSummary,
}

pub fn report_rows(report: UsageReport) -> Vec<UsageRow> {
    report
        .into_iter()
        .map(|(key, summary)| UsageRow { key, summary })
        .collect()
}
