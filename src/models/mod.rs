// Domain models: periods, snapshots, entity attributes, report shapes

mod period;
mod snapshot;
mod summary;

pub use period::Period;
pub use snapshot::{Counter, EntityAttributes, Snapshot};
pub use summary::{SummaryKey, UsageReport, UsageRow, UsageSummary, report_rows};
