//! Query types produced by the normalizer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Record category of a nutrition database entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Dish,
    Ingredient,
    BrandedProduct,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Dish,
        Category::Ingredient,
        Category::BrandedProduct,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Dish => "dish",
            Category::Ingredient => "ingredient",
            Category::BrandedProduct => "branded-product",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a descriptor names a prepared dish, a raw ingredient, or a
/// branded product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Dish,
    Ingredient,
    BrandedProduct,
}

impl Granularity {
    /// Categories searched first when the caller supplies none.
    pub fn default_categories(&self) -> Vec<Category> {
        match self {
            Granularity::Dish => vec![Category::Dish],
            Granularity::Ingredient => vec![Category::Ingredient],
            Granularity::BrandedProduct => vec![Category::BrandedProduct],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Dish => "dish",
            Granularity::Ingredient => "ingredient",
            Granularity::BrandedProduct => "branded-product",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional caller hints accompanying a raw descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryHints {
    /// Granularity decided upstream; inferred when absent.
    #[serde(default)]
    pub granularity: Option<Granularity>,
    /// Categories to search first; derived from granularity when empty.
    #[serde(default)]
    pub preferred_categories: Vec<Category>,
    /// Extra negative cues to merge with the ones found in the text.
    #[serde(default)]
    pub excluded_terms: Vec<String>,
}

impl QueryHints {
    pub fn with_granularity(granularity: Granularity) -> Self {
        Self {
            granularity: Some(granularity),
            ..Default::default()
        }
    }
}

/// A normalized search query. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    /// Trimmed descriptor with collapsed whitespace; sent verbatim by tier 0.
    pub raw_term: String,
    /// Lowercased, punctuation-free and optionally stemmed form used only
    /// for similarity scoring.
    pub normalized_term: String,
    pub granularity: Granularity,
    pub preferred_categories: Vec<Category>,
    /// Normalized negative cues; candidates naming them are dropped.
    pub excluded_terms: Vec<String>,
    /// Brand keywords detected in the descriptor, normalized.
    pub brand_tokens: Vec<String>,
}

impl Query {
    pub fn has_brand_context(&self) -> bool {
        !self.brand_tokens.is_empty()
    }
}
