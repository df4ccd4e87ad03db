// Metrics hooks for the matcher.
//
// A `SearchMetrics` implementation is handed to the engine with
// `SearchEngine::with_metrics`; the engine reports one event per search and
// one per backend call. Nothing is installed globally, so two engines in the
// same process can report to different backends.
use std::time::Duration;

use canonical::Granularity;
use index::SourceId;

use crate::types::{CallOutcome, MatchStatus};

/// Observer for search and backend-call outcomes.
pub trait SearchMetrics: Send + Sync {
    /// Record a finished search.
    ///
    /// `latency` is the wall-clock time from normalization to result, and
    /// `tiers_run` counts the tiers that were actually executed.
    fn record_search(
        &self,
        granularity: Granularity,
        status: MatchStatus,
        latency: Duration,
        tiers_run: usize,
    );

    /// Record one adapter call. Defaults to a no-op.
    fn record_backend_call(
        &self,
        _source: &SourceId,
        _tier_index: usize,
        _outcome: &CallOutcome,
        _latency: Duration,
    ) {
    }
}
