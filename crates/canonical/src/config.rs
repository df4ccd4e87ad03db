//! Configuration types for query normalization.
//!
//! [`NormalizeConfig`] controls how a raw food descriptor is turned into a
//! [`Query`](crate::Query): whether the similarity form is stemmed, which
//! words signal brand context, which words introduce negative cues and which
//! words mark a descriptor as a prepared dish.
//!
//! # Versioning
//!
//! The `version` field tracks behavior changes of the normalizer. Version 0
//! is reserved and rejected by [`NormalizeConfig::validate`].
//!
//! # Examples
//!
//! ```rust
//! use canonical::NormalizeConfig;
//!
//! let config = NormalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.stem);
//! assert!(config.brand_keywords.iter().any(|k| k == "branded"));
//! ```
//!
//! ## Adding brand keywords
//!
//! ```rust
//! use canonical::NormalizeConfig;
//!
//! let mut config = NormalizeConfig::default();
//! config.brand_keywords.push("trader joe's".to_string());
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Brand-context words recognized by default.
///
/// Entries are matched as whole-word phrases against the normalized
/// descriptor, so multi-word brands work as long as the words are adjacent.
pub const DEFAULT_BRAND_KEYWORDS: &[&str] = &[
    "brand",
    "branded",
    "store-bought",
    "packaged",
    "kraft",
    "heinz",
    "kellogg's",
    "nestle",
    "general mills",
    "campbell's",
    "quaker",
    "oreo",
    "cheerios",
    "doritos",
    "coca-cola",
    "pepsi",
    "starbucks",
    "mcdonald's",
    "subway",
    "kirkland",
];

/// Words whose following word is treated as an excluded term.
pub const DEFAULT_NEGATION_CUES: &[&str] = &["without", "no", "sans"];

/// Words that mark a descriptor as a prepared dish rather than an ingredient.
pub const DEFAULT_DISH_CUES: &[&str] = &[
    "with",
    "salad",
    "soup",
    "stew",
    "sandwich",
    "burger",
    "pizza",
    "pasta",
    "curry",
    "casserole",
    "pie",
    "taco",
    "burrito",
    "bowl",
    "stir-fry",
    "omelette",
    "lasagna",
    "meatloaf",
    "risotto",
    "sushi",
];

/// Configuration for the query normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Normalizer behavior version; must be >= 1.
    #[serde(default = "NormalizeConfig::default_version")]
    pub version: u32,
    /// Apply the light plural stemmer to the similarity form.
    #[serde(default = "NormalizeConfig::default_stem")]
    pub stem: bool,
    /// Brand-context words and phrases.
    #[serde(default = "NormalizeConfig::default_brand_keywords")]
    pub brand_keywords: Vec<String>,
    /// Words that turn the next word into an excluded term.
    #[serde(default = "NormalizeConfig::default_negation_cues")]
    pub negation_cues: Vec<String>,
    /// Words that suggest dish granularity when no hint is given.
    #[serde(default = "NormalizeConfig::default_dish_cues")]
    pub dish_cues: Vec<String>,
}

impl NormalizeConfig {
    fn default_version() -> u32 {
        1
    }

    fn default_stem() -> bool {
        true
    }

    fn default_brand_keywords() -> Vec<String> {
        DEFAULT_BRAND_KEYWORDS.iter().map(|s| s.to_string()).collect()
    }

    fn default_negation_cues() -> Vec<String> {
        DEFAULT_NEGATION_CUES.iter().map(|s| s.to_string()).collect()
    }

    fn default_dish_cues() -> Vec<String> {
        DEFAULT_DISH_CUES.iter().map(|s| s.to_string()).collect()
    }

    /// Validate the configuration before use.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.version == 0 {
            return Err(QueryError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        if self.brand_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(QueryError::InvalidConfig(
                "brand_keywords must not contain empty entries".into(),
            ));
        }
        if self.negation_cues.iter().any(|k| k.trim().is_empty()) {
            return Err(QueryError::InvalidConfig(
                "negation_cues must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            stem: Self::default_stem(),
            brand_keywords: Self::default_brand_keywords(),
            negation_cues: Self::default_negation_cues(),
            dish_cues: Self::default_dish_cues(),
        }
    }
}
