use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Reporting window in epoch milliseconds. Boundary inclusion is decided by the
/// accumulator's truncation rule, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub beginning_ms: i64,
    pub ending_ms: i64,
}

impl Period {
    pub const fn new(beginning_ms: i64, ending_ms: i64) -> Self {
        Self {
            beginning_ms,
            ending_ms,
        }
    }

    /// Length in ms, saturating at the i64 range. Negative for a degenerate
    /// truncated interval.
    pub fn duration_ms(&self) -> i64 {
        self.ending_ms.saturating_sub(self.beginning_ms)
    }

    /// Rejects periods that cannot serve as an extrapolation denominator.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.ending_ms <= self.beginning_ms {
            return Err(ReportError::InvalidPeriod {
                beginning_ms: self.beginning_ms,
                ending_ms: self.ending_ms,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.beginning_ms, self.ending_ms)
    }
}
