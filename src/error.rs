// Error taxonomy: store failures vs caller misuse. Sampling anomalies are not errors.

use thiserror::Error;

/// Any failure talking to or executing against the snapshot store.
/// The unit of work that hit it has already been rolled back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store path: {0}")]
    Io(#[from] std::io::Error),

    /// Used by adapters that are not backed by sqlx.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the reporting facade.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid period [{beginning_ms}, {ending_ms}]: duration must be > 0")]
    InvalidPeriod { beginning_ms: i64, ending_ms: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
