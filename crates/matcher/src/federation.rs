//! Federation executor: runs one tier's lanes concurrently.
//!
//! Each lane is a tokio task bounded by `min(search deadline, now +
//! backend_timeout)`. All lanes are awaited; a lane that fails or misses its
//! deadline contributes zero candidates and a diagnostic entry. Results are
//! merged in lane order, so arrival order never affects ranking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use canonical::{contains_phrase, normalize_text, words};
use futures::future::join_all;
use index::{BackendAdapter, BackendError, RawCandidate, SearchTier, SourceId};
use tokio::time::Instant;
use tracing::warn;

use crate::types::{BackendCall, BackendFailure, CallOutcome, LaneRole, MatchCandidate};

/// One adapter call within a tier.
#[derive(Debug, Clone)]
pub struct Lane {
    pub source: SourceId,
    /// Tier as sent to the backend; the category filter may be lane-specific.
    pub tier: SearchTier,
    /// `max_results` passed to the adapter.
    pub fetch: usize,
    pub role: LaneRole,
}

/// Candidates and trace of one finished lane.
#[derive(Debug, Clone)]
pub struct LaneOutcome {
    pub role: LaneRole,
    /// Boosted, exclusion-filtered candidates, best backend score first.
    pub candidates: Vec<MatchCandidate>,
    pub call: BackendCall,
    pub failure: Option<BackendFailure>,
}

/// Fans tiers out to registered adapters.
#[derive(Clone)]
pub struct FederationExecutor {
    adapters: HashMap<SourceId, Arc<dyn BackendAdapter>>,
    backend_timeout: Duration,
}

impl FederationExecutor {
    pub fn new(adapters: &[Arc<dyn BackendAdapter>], backend_timeout: Duration) -> Self {
        let adapters = adapters
            .iter()
            .map(|adapter| (adapter.source().clone(), Arc::clone(adapter)))
            .collect();
        Self {
            adapters,
            backend_timeout,
        }
    }

    /// Run every lane of `tier` and wait for all of them.
    pub async fn execute(
        &self,
        tier: &SearchTier,
        lanes: Vec<Lane>,
        search_deadline: Instant,
    ) -> Vec<LaneOutcome> {
        let tasks = lanes.into_iter().map(|lane| {
            let adapter = self.adapters.get(&lane.source).cloned();
            let lane_deadline = search_deadline.min(Instant::now() + self.backend_timeout);
            async move {
                let started = Instant::now();
                let result = match adapter {
                    Some(adapter) => {
                        let lane_tier = lane.tier.clone();
                        let fetch = lane.fetch;
                        let handle = tokio::spawn(async move {
                            tokio::time::timeout_at(
                                lane_deadline,
                                adapter.search(&lane_tier, fetch, lane_deadline),
                            )
                            .await
                        });
                        match handle.await {
                            Ok(Ok(result)) => result,
                            Ok(Err(_elapsed)) => Err(BackendError::Timeout(
                                lane_deadline.saturating_duration_since(started),
                            )),
                            Err(join_err) => Err(BackendError::unavailable(format!(
                                "lane task failed: {join_err}"
                            ))),
                        }
                    }
                    None => Err(BackendError::rejected(format!(
                        "no adapter registered for source `{}`",
                        lane.source
                    ))),
                };
                (lane, result, started.elapsed())
            }
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|(lane, result, elapsed)| finish_lane(tier, lane, result, elapsed))
            .collect()
    }
}

fn finish_lane(
    tier: &SearchTier,
    lane: Lane,
    result: Result<Vec<RawCandidate>, BackendError>,
    elapsed: Duration,
) -> LaneOutcome {
    let mut call = BackendCall {
        tier_index: tier.tier_index,
        source: lane.source.clone(),
        role: lane.role,
        category_filter: lane.tier.category_filter.clone(),
        outcome: CallOutcome::Ok { hits: 0 },
        elapsed,
    };

    match result {
        Ok(raw) => {
            let candidates = to_candidates(tier, &lane, raw);
            call.outcome = CallOutcome::Ok {
                hits: candidates.len(),
            };
            LaneOutcome {
                role: lane.role,
                candidates,
                call,
                failure: None,
            }
        }
        Err(err) => {
            warn!(
                source = %lane.source,
                tier = tier.tier_index,
                role = lane.role.tag(),
                error = %err,
                elapsed_micros = elapsed.as_micros() as u64,
                "backend_call_failed"
            );
            call.outcome = if err.is_timeout() {
                CallOutcome::TimedOut
            } else {
                CallOutcome::Failed {
                    error: err.to_string(),
                }
            };
            LaneOutcome {
                role: lane.role,
                candidates: Vec::new(),
                failure: Some(BackendFailure {
                    tier_index: tier.tier_index,
                    source: lane.source,
                    error: err.to_string(),
                }),
                call,
            }
        }
    }
}

/// Boost, drop excluded names, stamp the source and sort by backend score.
fn to_candidates(tier: &SearchTier, lane: &Lane, raw: Vec<RawCandidate>) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = raw
        .into_iter()
        .filter(|hit| hit.score.is_finite())
        .filter(|hit| !names_excluded_term(&hit.record.display_name, &tier.excluded_terms))
        .map(|hit| {
            let mut record = hit.record;
            if record.source_database.as_str().is_empty() {
                record.source_database = lane.source.clone();
            }
            let boosted = hit.score * tier.backend_score_boost;
            MatchCandidate {
                record,
                tier_index: tier.tier_index,
                backend_raw_score: boosted,
                similarity_score: 0.0,
                combined_score: boosted,
                strategy_tag: lane.role.tag().to_string(),
            }
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.backend_raw_score
            .total_cmp(&a.backend_raw_score)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    candidates.truncate(lane.fetch);
    candidates
}

/// Excluded terms are normalized and stemmed; compare against the display
/// name in the same form.
fn names_excluded_term(display_name: &str, excluded: &[String]) -> bool {
    if excluded.is_empty() {
        return false;
    }
    let stemmed = normalize_text(display_name, true);
    let name_words = words(&stemmed);
    excluded
        .iter()
        .any(|term| contains_phrase(&name_words, &words(term)))
}
