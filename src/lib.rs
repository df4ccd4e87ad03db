//! Workspace umbrella crate for foodmatch.
//!
//! Re-exports the query normalizer (`canonical`), the backend layer
//! (`index`) and the search engine (`matcher`) behind one dependency, and
//! adds YAML configuration loading so an engine can be built from a file:
//!
//! ```no_run
//! use foodmatch::{FoodMatchConfig, QueryHints, SearchOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = FoodMatchConfig::from_file("foodmatch.yaml")?.build_engine()?;
//! let result = engine
//!     .search_text("grilled chicken breast", &QueryHints::default(), SearchOptions::single())
//!     .await?;
//! println!("{:?} {:?}", result.status, result.best_match.map(|m| m.record.display_name));
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use canonical::{
    normalize_query, normalize_text, Category, Granularity, NormalizeConfig, Query, QueryError,
    QueryHints,
};
pub use config::{BackendYamlConfig, ConfigLoadError, FoodMatchConfig};
pub use index::{
    BackendAdapter, BackendError, FoodRecord, InMemoryBackend, RawCandidate, RetryConfig,
    RetryingBackend, SearchTier, SourceHint, SourceId, StoreError, TierKind,
};
pub use matcher::{
    BackendCall, CallOutcome, Confidence, FallbackReason, MatchCandidate, MatchConfig, MatchError,
    MatchResult, MatchStatus, SearchEngine, SearchMetrics, SearchMode, SearchOptions, SearchState,
    SimilarityWeights, StrategyMetadata,
};
