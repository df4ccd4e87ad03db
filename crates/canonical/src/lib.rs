//! Query normalization layer.
//!
//! Turns a free-text food descriptor (a dish or ingredient name extracted
//! upstream) into a [`Query`] the search engine can reason about.
//!
//! ## What we do
//!
//! - Keep a literal form (`raw_term`): trimmed, whitespace collapsed, case and
//!   punctuation untouched. The first search tier sends it verbatim so exact
//!   matches keep their precision.
//! - Build a similarity form (`normalized_term`): NFKC, lowercase, punctuation
//!   stripped except internal hyphens, optional light plural stemming.
//! - Pull out negative cues ("salad without onions" excludes "onion").
//! - Detect brand-context words from a configurable list and turn them into
//!   category hints.
//! - Infer granularity (dish / ingredient / branded product) when the caller
//!   does not supply one.
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock, no locale. Same descriptor + hints + config gives the
//! same [`Query`] on any machine.
//!
//! ```rust
//! use canonical::{normalize_query, Category, Granularity, NormalizeConfig, QueryHints};
//!
//! let cfg = NormalizeConfig::default();
//! let query = normalize_query("  Chicken salad without Onions ", &QueryHints::default(), &cfg)
//!     .expect("non-empty descriptor");
//!
//! assert_eq!(query.raw_term, "Chicken salad without Onions");
//! assert_eq!(query.normalized_term, "chicken salad");
//! assert_eq!(query.excluded_terms, vec!["onion".to_string()]);
//! assert_eq!(query.granularity, Granularity::Dish);
//! assert_eq!(query.preferred_categories, vec![Category::Dish]);
//! ```

mod config;
mod error;
mod pipeline;
mod query;
mod stem;
mod token;
mod whitespace;

pub use crate::config::{
    NormalizeConfig, DEFAULT_BRAND_KEYWORDS, DEFAULT_DISH_CUES, DEFAULT_NEGATION_CUES,
};
pub use crate::error::QueryError;
pub use crate::pipeline::{normalize_query, normalize_text, words};
pub use crate::query::{Category, Granularity, Query, QueryHints};
pub use crate::stem::{stem_text, stem_word};
pub use crate::token::{contains_phrase, tokenize, Token};
pub use crate::whitespace::collapse_whitespace;
