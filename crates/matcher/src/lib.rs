//! # Food Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` turns a normalized food descriptor into the best-matching
//! nutrition record across one or more databases. It sits on top of the
//! query normalizer (`canonical`) and the backend layer (`index`).
//!
//! A search walks a cascade of progressively broader tiers:
//!
//! 1. **Exact**: the literal descriptor with the preferred categories.
//! 2. **Simplified**: cut at connector words, then drop the last comma
//!    segment or the modifier words.
//! 3. **Generalized**: head noun only, with a widened category filter.
//! 4. **Cross-database**: the broadest query against databases the cascade
//!    did not reach.
//!
//! Each tier fans out to its backends concurrently ([`FederationExecutor`]),
//! candidates are rescored by string similarity ([`Reranker`]) and ranked
//! deterministically ([`dedup`]). The cascade stops at the first tier whose
//! top backend score meets `MatchConfig::min_score_threshold`. The
//! [`FallbackPolicy`] decides per granularity which databases each tier
//! reaches: dishes cascade on the primary database with a branded
//! supplement, ingredients federate primary, secondary and branded lanes on
//! every tier.
//!
//! ## Core Types
//!
//! - [`SearchEngine`]: owns the adapters and configuration; entry point.
//! - [`MatchConfig`]: threshold, tier boosts, widening rules, similarity
//!   weights, result caps and the backend timeout.
//! - [`MatchResult`]: best match, alternates, status and the
//!   [`StrategyMetadata`] trace (tiers, backend calls, states, errors).
//! - [`SearchMetrics`]: optional observer injected with
//!   [`SearchEngine::with_metrics`].
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use canonical::{Category, QueryHints};
//! use index::{BackendAdapter, FoodRecord, InMemoryBackend};
//! use matcher::{MatchConfig, MatchStatus, SearchEngine, SearchOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let usda = InMemoryBackend::from_records(
//!     "usda",
//!     vec![FoodRecord::new("171077", "Chicken breast", Category::Ingredient)],
//! )?;
//! let adapters: Vec<Arc<dyn BackendAdapter>> = vec![Arc::new(usda)];
//! let engine = SearchEngine::new(adapters, MatchConfig::default())?;
//!
//! let result = engine
//!     .search_text("chicken breast", &QueryHints::default(), SearchOptions::single())
//!     .await?;
//! assert_eq!(result.status, MatchStatus::Matched);
//! assert_eq!(result.best_match.unwrap().record.id, "171077");
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Every search runs in a `matcher.search` span and ends with a
//! `search_complete` event; failed or timed-out backend calls are logged at
//! `warn` level and recorded in `StrategyMetadata::backend_errors`.

mod config;
pub mod dedup;
mod engine;
mod federation;
mod metrics;
mod policy;
pub mod rerank;
mod tiers;
mod types;

pub use crate::config::{
    MatchConfig, SimilarityWeights, DEFAULT_CONNECTOR_WORDS, DEFAULT_MODIFIER_WORDS,
};
pub use crate::dedup::SourcePriority;
pub use crate::engine::SearchEngine;
pub use crate::federation::{FederationExecutor, Lane, LaneOutcome};
pub use crate::metrics::SearchMetrics;
pub use crate::policy::FallbackPolicy;
pub use crate::rerank::Reranker;
pub use crate::tiers::{is_strict_relaxation, TierGenerator, TierPlanContext};
pub use crate::types::{
    BackendCall, BackendFailure, CallOutcome, Confidence, FallbackReason, LaneRole,
    MatchCandidate, MatchError, MatchResult, MatchStatus, SearchMode, SearchOptions, SearchState,
    StrategyMetadata,
};
