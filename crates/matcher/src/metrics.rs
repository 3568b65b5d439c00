// Metrics hooks for the matcher.
//
// Callers install a global `MatchMetrics` implementation via
// [`set_match_metrics`]; every query through [`crate::Matcher`] then reports
// its latency, candidate count and best overlap.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for match operations.
pub trait MatchMetrics: Send + Sync {
    /// Record one query. `best_overlap` is the highest overlap seen, whether
    /// or not it cleared the match threshold.
    fn record_match(&self, latency: Duration, candidates: usize, best_overlap: usize, matched: bool);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global match metrics recorder.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
