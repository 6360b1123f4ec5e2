// Finds the latest snapshot before an instant without scanning all history.
// Searches backward from the instant in windows of 2h, 4h, 16h, 256h, ...
// (the hour multiplier is squared each step) until one contains a snapshot or
// the window would reach back past the epoch.

use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::snapshot_store::SnapshotStore;

pub const HOUR_MS: i64 = 60 * 60 * 1000;
const INITIAL_MULTIPLIER: i64 = 2;

/// One backward search window, exclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// The hour multiplier used after `multiplier`. `None` once it overflows.
pub fn next_multiplier(multiplier: i64) -> Option<i64> {
    multiplier.checked_mul(multiplier)
}

/// Window sequence anchored at `before_ms`. Every window contains the previous
/// one, so the first window with any snapshot holds the true latest one.
#[derive(Debug, Clone)]
pub struct SearchWindows {
    before_ms: i64,
    multiplier: Option<i64>,
}

impl SearchWindows {
    pub fn new(before_ms: i64) -> Self {
        Self {
            before_ms,
            multiplier: Some(INITIAL_MULTIPLIER),
        }
    }
}

impl Iterator for SearchWindows {
    type Item = SearchWindow;

    fn next(&mut self) -> Option<SearchWindow> {
        let multiplier = self.multiplier.take()?;
        let start_ms = self.before_ms.checked_sub(HOUR_MS.checked_mul(multiplier)?)?;
        if start_ms <= 0 {
            return None;
        }
        self.multiplier = next_multiplier(multiplier);
        Some(SearchWindow {
            start_ms,
            end_ms: self.before_ms,
        })
    }
}

/// Latest snapshot timestamp strictly before `timestamp_ms`, across all identities.
/// `None` means no anchor exists within the searchable range. Each window is its
/// own store query; the first failing one aborts the search.
#[instrument(skip(store), fields(operation = "find_latest_before"))]
pub async fn find_latest_before<S: SnapshotStore>(
    store: &S,
    timestamp_ms: i64,
) -> Result<Option<i64>, StoreError> {
    for (iteration, window) in SearchWindows::new(timestamp_ms).enumerate() {
        debug!(
            iteration,
            start_ms = window.start_ms,
            "searching for latest snapshot before beginning"
        );
        if let Some(found) = store
            .latest_snapshot_in_window(window.start_ms, window.end_ms)
            .await?
        {
            info!(
                found_ms = found,
                iterations = iteration + 1,
                "found latest snapshot before beginning"
            );
            return Ok(Some(found));
        }
    }
    info!("no snapshot before beginning");
    Ok(None)
}
