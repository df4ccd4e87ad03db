use std::fmt;

use canonical::{normalize_text, words, Category};
use serde::{Deserialize, Serialize};

use crate::record::SourceId;

/// How a tier relaxes the query it was derived from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum TierKind {
    /// The literal descriptor.
    Exact,
    /// Trailing qualifiers removed.
    Simplified,
    /// Head noun only, widened categories.
    Generalized,
    /// Same query sent to databases the cascade has not touched.
    CrossDatabase,
    /// Branded records from the primary database after a weak cascade.
    BrandedSupplement,
}

impl TierKind {
    /// Position of this kind in the cascade. Skipped tiers leave gaps.
    pub fn index(&self) -> usize {
        match self {
            TierKind::Exact => 0,
            TierKind::Simplified => 1,
            TierKind::Generalized => 2,
            TierKind::CrossDatabase => 3,
            TierKind::BrandedSupplement => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Exact => "exact",
            TierKind::Simplified => "simplified",
            TierKind::Generalized => "generalized",
            TierKind::CrossDatabase => "cross-database",
            TierKind::BrandedSupplement => "branded-supplement",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backends a tier targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", tag = "type", content = "sources")]
pub enum SourceHint {
    #[default]
    All,
    Sources(Vec<SourceId>),
}

impl SourceHint {
    /// Sources named by the hint, or `None` for [`SourceHint::All`].
    pub fn sources(&self) -> Option<&[SourceId]> {
        match self {
            SourceHint::All => None,
            SourceHint::Sources(sources) => Some(sources),
        }
    }
}

/// One query variant in a progressively broadened cascade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchTier {
    pub tier_index: usize,
    pub kind: TierKind,
    pub query_string: String,
    /// Record categories accepted by this tier; empty accepts any.
    pub category_filter: Vec<Category>,
    /// Multiplier applied to backend scores before threshold checks.
    pub backend_score_boost: f64,
    pub source_hint: SourceHint,
    /// Candidates whose display name contains one of these are dropped.
    #[serde(default)]
    pub excluded_terms: Vec<String>,
}

impl SearchTier {
    pub fn accepts(&self, category: Category) -> bool {
        self.category_filter.is_empty() || self.category_filter.contains(&category)
    }

    /// Copy of this tier with a different category filter, used for lanes
    /// that search a fixed category such as branded products.
    pub fn with_category_filter(&self, filter: Vec<Category>) -> SearchTier {
        SearchTier {
            category_filter: filter,
            ..self.clone()
        }
    }

    /// Normalized, unstemmed words a matching record must relate to.
    pub fn required_words(&self) -> Vec<String> {
        let normalized = normalize_text(&self.query_string, false);
        words(&normalized).into_iter().map(str::to_string).collect()
    }

    /// Short label used in strategy tags and logs, e.g. `tier1`.
    pub fn label(&self) -> String {
        format!("tier{}", self.tier_index)
    }
}
