use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use canonical::{normalize_query, Query, QueryHints};
use futures::future::join_all;
use index::{BackendAdapter, SearchTier, SourceId, TierKind};
use tokio::time::Instant;
use tracing::{debug, info, Instrument};

use crate::config::MatchConfig;
use crate::dedup::{dedup, rank, SourcePriority};
use crate::federation::FederationExecutor;
use crate::metrics::SearchMetrics;
use crate::policy::FallbackPolicy;
use crate::rerank::Reranker;
use crate::tiers::TierGenerator;
use crate::types::{
    Confidence, FallbackReason, MatchCandidate, MatchError, MatchResult, MatchStatus, SearchMode,
    SearchOptions, SearchState, StrategyMetadata,
};


/// Used when `start + deadline` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Multi-tier federated search over a fixed set of backend adapters.
///
/// Cheap to clone; adapters are shared handles and the engine holds no
/// other mutable state.
#[derive(Clone)]
pub struct SearchEngine {
    config: MatchConfig,
    sources: Vec<SourceId>,
    generator: TierGenerator,
    reranker: Reranker,
    policy: FallbackPolicy,
    executor: FederationExecutor,
    priority: SourcePriority,
    metrics: Option<Arc<dyn SearchMetrics>>,
}

/// Tier whose candidates met the score threshold.
struct ThresholdHit {
    tier_index: usize,
    kind: TierKind,
    ranked: Vec<MatchCandidate>,
}

impl SearchEngine {
    /// Validate `config` and register `adapters` in order.
    ///
    /// The primary database is `config.primary_source`, or the first adapter
    /// when unset; every other adapter is a secondary database. Source
    /// priority defaults to registration order.
    pub fn new(
        adapters: Vec<Arc<dyn BackendAdapter>>,
        config: MatchConfig,
    ) -> Result<Self, MatchError> {
        config.validate()?;
        if adapters.is_empty() {
            return Err(MatchError::InvalidConfig(
                "at least one backend adapter must be registered".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(adapters.len());
        for adapter in &adapters {
            let source = adapter.source().clone();
            if source.as_str().trim().is_empty() {
                return Err(MatchError::InvalidConfig(
                    "backend adapters must have a non-empty source id".into(),
                ));
            }
            if !seen.insert(source.clone()) {
                return Err(MatchError::InvalidConfig(format!(
                    "backend source `{source}` is registered twice"
                )));
            }
            sources.push(source);
        }

        let primary = match &config.primary_source {
            Some(primary) if sources.contains(primary) => primary.clone(),
            Some(primary) => {
                return Err(MatchError::InvalidConfig(format!(
                    "primary_source `{primary}` has no registered adapter"
                )));
            }
            None => sources[0].clone(),
        };
        let secondaries: Vec<SourceId> = sources
            .iter()
            .filter(|s| **s != primary)
            .cloned()
            .collect();

        let priority = if config.source_priority.is_empty() {
            let mut order = vec![primary.clone()];
            order.extend(secondaries.iter().cloned());
            SourcePriority::new(order)
        } else {
            SourcePriority::new(config.source_priority.clone())
        };

        Ok(Self {
            generator: TierGenerator::new(&config),
            reranker: Reranker::new(config.similarity, config.normalizer.stem),
            policy: FallbackPolicy::new(primary, secondaries, &config),
            executor: FederationExecutor::new(&adapters, config.backend_timeout),
            priority,
            sources,
            metrics: None,
            config,
        })
    }

    /// Report searches and backend calls to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Registered sources in registration order.
    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn primary_source(&self) -> &SourceId {
        self.policy.primary()
    }

    pub fn source_priority(&self) -> &SourcePriority {
        &self.priority
    }

    /// Search with an already normalized query. Never fails: backend
    /// problems end up in `strategy` and `status`.
    ///
    /// `max_results == 0` falls back to `MatchConfig::default_max_results`.
    pub async fn search(
        &self,
        query: &Query,
        mode: SearchMode,
        max_results: usize,
        deadline: Duration,
    ) -> MatchResult {
        let options = SearchOptions {
            mode,
            max_results: Some(max_results),
            deadline,
            disambiguate: false,
        };
        self.search_with_options(query, options).await
    }

    pub async fn search_with_options(&self, query: &Query, options: SearchOptions) -> MatchResult {
        let span = tracing::info_span!(
            "matcher.search",
            term = %query.normalized_term,
            granularity = %query.granularity,
            mode = ?options.mode
        );
        self.run(query, options).instrument(span).await
    }

    /// Normalize `raw` with the engine's normalizer config, then search.
    pub async fn search_text(
        &self,
        raw: &str,
        hints: &QueryHints,
        options: SearchOptions,
    ) -> Result<MatchResult, MatchError> {
        let query = normalize_query(raw, hints, &self.config.normalizer)?;
        Ok(self.search_with_options(&query, options).await)
    }

    /// Search independent descriptors concurrently. Results keep input order.
    pub async fn search_batch(
        &self,
        descriptors: Vec<(String, QueryHints)>,
        options: SearchOptions,
    ) -> Vec<Result<MatchResult, MatchError>> {
        let searches = descriptors
            .into_iter()
            .map(|(raw, hints)| async move { self.search_text(&raw, &hints, options).await });
        join_all(searches).await
    }

    async fn run(&self, query: &Query, options: SearchOptions) -> MatchResult {
        let started = Instant::now();
        let search_deadline = started
            .checked_add(options.deadline)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let max_results = options
            .max_results
            .filter(|n| *n > 0)
            .unwrap_or(self.config.default_max_results);

        let path = self.policy.path_for(query.granularity);
        let mut strategy = StrategyMetadata::new(path);

        if query.raw_term.trim().is_empty() {
            strategy.states.push(SearchState::Failed {
                reason: "query has no searchable text".into(),
            });
            return self.finish(query, strategy, None, Vec::new(), MatchStatus::Error, started);
        }

        let mut queue = self.generator.generate(query, &self.policy.plan_context(path));
        strategy
            .states
            .push(SearchState::TierScheduled { tiers: queue.len() });

        let mut accumulated: Vec<MatchCandidate> = Vec::new();
        let mut hit: Option<ThresholdHit> = None;
        let mut supplement_scheduled = false;
        let mut next = 0;

        loop {
            if next == queue.len() {
                if !supplement_scheduled && self.policy.wants_branded_supplement(path) {
                    if let Some(last) = queue.last() {
                        let supplement =
                            self.generator.branded_supplement(last, self.policy.primary());
                        queue.push(supplement);
                        supplement_scheduled = true;
                        continue;
                    }
                }
                break;
            }
            if Instant::now() >= search_deadline {
                debug!(remaining_tiers = queue.len() - next, "search deadline reached");
                break;
            }

            let tier = queue[next].clone();
            next += 1;

            let (ranked, met) = self
                .run_tier(query, &tier, max_results, search_deadline, &mut strategy)
                .await;
            accumulated.extend(ranked.iter().cloned());
            if met {
                strategy.states.push(SearchState::ThresholdMet {
                    tier_index: tier.tier_index,
                });
                hit = Some(ThresholdHit {
                    tier_index: tier.tier_index,
                    kind: tier.kind,
                    ranked,
                });
                break;
            }
        }

        let all_failed = !strategy.backend_calls.is_empty()
            && strategy.backend_calls.iter().all(|call| !call.outcome.is_ok());
        let pool = dedup(accumulated, &self.priority);

        let (best, status) = match hit {
            Some(hit) => {
                strategy.confidence = Confidence::High;
                strategy.matching_tier = Some(hit.tier_index);
                strategy.fallback_reason = match hit.kind {
                    TierKind::CrossDatabase => Some(FallbackReason::CrossDatabase),
                    TierKind::BrandedSupplement => Some(FallbackReason::BrandedSupplement),
                    _ => None,
                };
                (hit.ranked.into_iter().next(), MatchStatus::Matched)
            }
            None if pool.is_empty() => {
                strategy.states.push(SearchState::NoCandidates);
                if all_failed {
                    strategy.fallback_reason = Some(FallbackReason::AllBackendsFailed);
                    (None, MatchStatus::Error)
                } else {
                    strategy.fallback_reason = Some(FallbackReason::NoCandidates);
                    (None, MatchStatus::NoMatch)
                }
            }
            None => {
                strategy.states.push(SearchState::TiersExhausted);
                strategy.confidence = Confidence::Low;
                strategy.fallback_reason = Some(FallbackReason::ThresholdNotMet);
                (pool.first().cloned(), MatchStatus::Matched)
            }
        };

        let (alternates, status) = self.assemble(best.as_ref(), pool, options, max_results, status);
        self.finish(query, strategy, best, alternates, status, started)
    }

    /// Run one tier: fan out, cap, rescore, tag and rank. Returns the tier's
    /// ranked candidates and whether its top backend score met the threshold.
    async fn run_tier(
        &self,
        query: &Query,
        tier: &SearchTier,
        max_results: usize,
        search_deadline: Instant,
        strategy: &mut StrategyMetadata,
    ) -> (Vec<MatchCandidate>, bool) {
        let path = strategy.path;
        strategy.states.push(SearchState::Searching {
            tier_index: tier.tier_index,
        });
        let lanes = self.policy.lanes(path, tier, max_results);
        debug!(
            tier = tier.tier_index,
            kind = %tier.kind,
            query = %tier.query_string,
            lanes = lanes.len(),
            "running tier"
        );

        let mut outcomes = self.executor.execute(tier, lanes, search_deadline).await;
        self.policy.cap_supplementary(path, &mut outcomes, max_results);

        let mut candidates = Vec::new();
        for outcome in outcomes {
            if let Some(metrics) = &self.metrics {
                metrics.record_backend_call(
                    &outcome.call.source,
                    outcome.call.tier_index,
                    &outcome.call.outcome,
                    outcome.call.elapsed,
                );
            }
            strategy.backend_calls.push(outcome.call);
            strategy.backend_errors.extend(outcome.failure);
            candidates.extend(outcome.candidates);
        }
        strategy.tiers.push(tier.clone());

        let top_raw_score = candidates
            .iter()
            .map(|c| c.backend_raw_score)
            .max_by(f64::total_cmp);
        strategy.states.push(SearchState::Scored {
            tier_index: tier.tier_index,
            top_raw_score,
        });
        let met = top_raw_score.is_some_and(|score| score >= self.config.min_score_threshold);

        self.reranker.rescore(query, &mut candidates);
        for candidate in &mut candidates {
            retag(candidate, tier, met);
        }
        rank(&mut candidates, &self.priority);
        debug!(
            tier = tier.tier_index,
            candidates = candidates.len(),
            top_raw_score = ?top_raw_score,
            threshold_met = met,
            "tier scored"
        );
        (candidates, met)
    }

    /// Alternates for multi mode, or the tied candidates of an ambiguous
    /// single-mode result.
    fn assemble(
        &self,
        best: Option<&MatchCandidate>,
        pool: Vec<MatchCandidate>,
        options: SearchOptions,
        max_results: usize,
        status: MatchStatus,
    ) -> (Vec<MatchCandidate>, MatchStatus) {
        let Some(best) = best else {
            return (Vec::new(), status);
        };
        let others = pool.into_iter().filter(|c| c.record.id != best.record.id);
        match options.mode {
            SearchMode::Multi => {
                let cap = max_results.saturating_sub(1).min(self.config.result_limit);
                (others.take(cap).collect(), status)
            }
            SearchMode::Single if options.disambiguate => {
                let tied: Vec<MatchCandidate> = others
                    .filter(|c| c.combined_score == best.combined_score)
                    .take(self.config.result_limit)
                    .collect();
                if tied.is_empty() {
                    (tied, status)
                } else {
                    (tied, MatchStatus::Ambiguous)
                }
            }
            SearchMode::Single => (Vec::new(), status),
        }
    }

    fn finish(
        &self,
        query: &Query,
        mut strategy: StrategyMetadata,
        best_match: Option<MatchCandidate>,
        alternates: Vec<MatchCandidate>,
        status: MatchStatus,
        started: Instant,
    ) -> MatchResult {
        if !matches!(strategy.states.last(), Some(SearchState::Failed { .. })) {
            strategy.states.push(SearchState::Finalized { status });
        }
        strategy.elapsed = started.elapsed();

        let tiers_run = strategy.tiers.len();
        info!(
            status = %status,
            tiers_run,
            matching_tier = ?strategy.matching_tier,
            backend_errors = strategy.backend_errors.len(),
            elapsed_micros = strategy.elapsed.as_micros() as u64,
            "search_complete"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_search(query.granularity, status, strategy.elapsed, tiers_run);
        }

        MatchResult {
            query: query.clone(),
            best_match,
            alternates,
            strategy,
            status,
        }
    }
}

/// Tier 0 and the fallback tiers keep the lane tag; later cascade tiers that
/// met the threshold are prefixed with the tier; tiers that did not are
/// marked low-score, except the branded supplement.
fn retag(candidate: &mut MatchCandidate, tier: &SearchTier, met: bool) {
    match tier.kind {
        TierKind::BrandedSupplement => {}
        _ if !met => candidate.strategy_tag = format!("{}-low-score", tier.label()),
        TierKind::Simplified | TierKind::Generalized => {
            candidate.strategy_tag = format!("{}-{}", tier.label(), candidate.strategy_tag);
        }
        TierKind::Exact | TierKind::CrossDatabase => {}
    }
}
