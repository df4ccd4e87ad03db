use std::fmt;
use std::time::Duration;

use canonical::{Category, Query, QueryError};
use index::{FoodRecord, SearchTier, SourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether the caller wants one answer or a ranked list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Single,
    Multi,
}

/// Per-call options for [`SearchEngine::search_text`](crate::SearchEngine::search_text).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    #[serde(default)]
    pub mode: SearchMode,
    /// Result budget; `MatchConfig::default_max_results` when unset.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Wall-clock budget for the whole search.
    #[serde(
        default = "SearchOptions::default_deadline",
        with = "index::serde_millis",
        rename = "deadline_ms"
    )]
    pub deadline: Duration,
    /// In single mode, report exact top-score ties as ambiguous instead of
    /// silently applying the tie-break.
    #[serde(default)]
    pub disambiguate: bool,
}

impl SearchOptions {
    fn default_deadline() -> Duration {
        Duration::from_secs(5)
    }

    pub fn single() -> Self {
        Self::default()
    }

    pub fn multi(max_results: usize) -> Self {
        Self {
            mode: SearchMode::Multi,
            max_results: Some(max_results),
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_disambiguation(mut self) -> Self {
        self.disambiguate = true;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Single,
            max_results: None,
            deadline: Self::default_deadline(),
            disambiguate: false,
        }
    }
}

/// A scored record surfaced during one search call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchCandidate {
    pub record: FoodRecord,
    pub tier_index: usize,
    /// Backend score after the tier boost.
    pub backend_raw_score: f64,
    /// Fused string similarity in `[0, 1]`.
    pub similarity_score: f64,
    /// `backend_raw_score * (1 + similarity_score)`.
    pub combined_score: f64,
    pub strategy_tag: String,
}

impl MatchCandidate {
    pub fn source(&self) -> &SourceId {
        &self.record.source_database
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    Matched,
    NoMatch,
    Ambiguous,
    Error,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::NoMatch => "no-match",
            MatchStatus::Ambiguous => "ambiguous",
            MatchStatus::Error => "error",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the caller should trust `best_match`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// A tier reached the score threshold.
    High,
    /// Best of the accumulated candidates; no tier reached the threshold.
    Low,
    None,
}

/// Why the search left the primary cascade or ended without a confident match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// The match came from databases outside the cascade.
    CrossDatabase,
    /// The match came from branded records merged into a weak dish search.
    BrandedSupplement,
    /// No tier reached the threshold; best accumulated candidate returned.
    ThresholdNotMet,
    NoCandidates,
    AllBackendsFailed,
}

/// Strategy chosen by the fallback policy for a query's granularity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyPath {
    /// Cascade on the primary database, branded supplement when weak.
    DishCascade,
    /// Primary, secondary and branded lanes federated on every tier.
    IngredientFederation,
    /// Cascade on the primary database with branded categories.
    BrandedCascade,
}

/// Part a lane plays in a tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LaneRole {
    Primary,
    SecondaryDatabase,
    Branded,
    CrossDatabase,
}

impl LaneRole {
    pub fn tag(&self) -> &'static str {
        match self {
            LaneRole::Primary => "primary",
            LaneRole::SecondaryDatabase => "fallback-multi-db",
            LaneRole::Branded => "fallback-branded",
            LaneRole::CrossDatabase => "fallback-cross-db",
        }
    }

    pub fn is_supplementary(&self) -> bool {
        matches!(self, LaneRole::SecondaryDatabase | LaneRole::Branded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum CallOutcome {
    Ok { hits: usize },
    Failed { error: String },
    TimedOut,
}

impl CallOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CallOutcome::Ok { .. })
    }
}

/// Trace of one adapter call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendCall {
    pub tier_index: usize,
    pub source: SourceId,
    pub role: LaneRole,
    pub category_filter: Vec<Category>,
    #[serde(flatten)]
    pub outcome: CallOutcome,
    #[serde(with = "index::serde_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

/// A failed or timed-out adapter call kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendFailure {
    pub tier_index: usize,
    pub source: SourceId,
    pub error: String,
}

/// Per-query state machine steps, in the order they were entered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "state")]
pub enum SearchState {
    Normalized,
    TierScheduled { tiers: usize },
    Searching { tier_index: usize },
    Scored { tier_index: usize, top_raw_score: Option<f64> },
    ThresholdMet { tier_index: usize },
    TiersExhausted,
    NoCandidates,
    Finalized { status: MatchStatus },
    Failed { reason: String },
}

/// How a result was reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyMetadata {
    pub path: StrategyPath,
    /// Tiers actually executed, in order.
    pub tiers: Vec<SearchTier>,
    pub backend_calls: Vec<BackendCall>,
    #[serde(with = "index::serde_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
    pub fallback_reason: Option<FallbackReason>,
    /// Tier whose results met the threshold.
    pub matching_tier: Option<usize>,
    pub confidence: Confidence,
    pub states: Vec<SearchState>,
    pub backend_errors: Vec<BackendFailure>,
}

impl StrategyMetadata {
    pub(crate) fn new(path: StrategyPath) -> Self {
        Self {
            path,
            tiers: Vec::new(),
            backend_calls: Vec::new(),
            elapsed: Duration::ZERO,
            fallback_reason: None,
            matching_tier: None,
            confidence: Confidence::None,
            states: vec![SearchState::Normalized],
            backend_errors: Vec::new(),
        }
    }

    /// Sources that were called at least once, in first-call order.
    pub fn sources_consulted(&self) -> Vec<&SourceId> {
        let mut out: Vec<&SourceId> = Vec::new();
        for call in &self.backend_calls {
            if !out.contains(&&call.source) {
                out.push(&call.source);
            }
        }
        out
    }
}

/// Outcome of one search call. "No match" is a normal result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub query: Query,
    pub best_match: Option<MatchCandidate>,
    pub alternates: Vec<MatchCandidate>,
    pub strategy: StrategyMetadata,
    pub status: MatchStatus,
}

impl MatchResult {
    /// Best match followed by the alternates.
    pub fn candidates(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.best_match.iter().chain(self.alternates.iter())
    }
}

/// Errors produced by the matching layer.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Invalid engine configuration; raised at construction time.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The descriptor had nothing searchable in it.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),
}
