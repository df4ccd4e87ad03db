//! Engine configuration.
//!
//! [`MatchConfig`] is supplied once at construction time. Every threshold,
//! cap and weight the engine uses lives here with the empirically tuned
//! defaults (20.0 score threshold; 3, 5, 10 and 15 result caps); none of
//! them is hard-coded in the search path.

use std::collections::BTreeMap;
use std::time::Duration;

use canonical::{Category, NormalizeConfig};
use index::SourceId;
use serde::{Deserialize, Serialize};

use crate::types::MatchError;

/// Words that end the core of a descriptor; everything from the first one on
/// is dropped by the simplified tier.
pub const DEFAULT_CONNECTOR_WORDS: &[&str] =
    &["with", "in", "on", "topped", "served", "without"];

/// Cooking methods and descriptors dropped by the simplified tier.
pub const DEFAULT_MODIFIER_WORDS: &[&str] = &[
    "raw",
    "cooked",
    "fried",
    "deep-fried",
    "grilled",
    "baked",
    "roasted",
    "boiled",
    "steamed",
    "sauteed",
    "broiled",
    "braised",
    "poached",
    "scrambled",
    "mashed",
    "fresh",
    "frozen",
    "canned",
    "dried",
    "sliced",
    "diced",
    "chopped",
    "shredded",
    "prepared",
    "home-prepared",
    "homemade",
    "plain",
    "whole",
    "organic",
    "large",
    "medium",
    "small",
    "lean",
    "boneless",
    "skinless",
    "low-fat",
    "nonfat",
];

/// Fixed weights of the similarity signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarityWeights {
    #[serde(default = "SimilarityWeights::default_jaro_winkler")]
    pub jaro_winkler: f64,
    /// Normalized Levenshtein, `1 - distance / max(len)`.
    #[serde(default = "SimilarityWeights::default_levenshtein")]
    pub levenshtein: f64,
    /// Whole-string indel ratio.
    #[serde(default = "SimilarityWeights::default_ratio")]
    pub ratio: f64,
    /// Best ratio of the shorter string against windows of the longer one.
    #[serde(default = "SimilarityWeights::default_partial_ratio")]
    pub partial_ratio: f64,
    /// Added when a detected brand token appears in the display name.
    #[serde(default = "SimilarityWeights::default_brand_bonus")]
    pub brand_bonus: f64,
}

impl SimilarityWeights {
    pub const JARO_WINKLER: f64 = 0.4;
    pub const LEVENSHTEIN: f64 = 0.3;
    pub const RATIO: f64 = 0.2;
    pub const PARTIAL_RATIO: f64 = 0.1;
    pub const BRAND_BONUS: f64 = 0.3;

    fn default_jaro_winkler() -> f64 {
        Self::JARO_WINKLER
    }

    fn default_levenshtein() -> f64 {
        Self::LEVENSHTEIN
    }

    fn default_ratio() -> f64 {
        Self::RATIO
    }

    fn default_partial_ratio() -> f64 {
        Self::PARTIAL_RATIO
    }

    fn default_brand_bonus() -> f64 {
        Self::BRAND_BONUS
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let named = [
            ("jaro_winkler", self.jaro_winkler),
            ("levenshtein", self.levenshtein),
            ("ratio", self.ratio),
            ("partial_ratio", self.partial_ratio),
            ("brand_bonus", self.brand_bonus),
        ];
        for (name, weight) in named {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "similarity weight `{name}` must be a finite value >= 0.0"
                )));
            }
        }
        if self.jaro_winkler + self.levenshtein + self.ratio + self.partial_ratio <= 0.0 {
            return Err(MatchError::InvalidConfig(
                "at least one similarity signal weight must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            jaro_winkler: Self::JARO_WINKLER,
            levenshtein: Self::LEVENSHTEIN,
            ratio: Self::RATIO,
            partial_ratio: Self::PARTIAL_RATIO,
            brand_bonus: Self::BRAND_BONUS,
        }
    }
}

/// Configuration for a [`SearchEngine`](crate::SearchEngine).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// Configuration schema version; must be >= 1.
    #[serde(default = "MatchConfig::default_version")]
    pub version: u32,
    /// Boosted backend score at which the cascade stops.
    #[serde(default = "MatchConfig::default_min_score_threshold")]
    pub min_score_threshold: f64,
    /// Primary database; the first registered adapter when unset.
    #[serde(default)]
    pub primary_source: Option<SourceId>,
    /// Tie-break order of sources. Registration order when empty; unlisted
    /// sources rank after listed ones, by name.
    #[serde(default)]
    pub source_priority: Vec<SourceId>,
    /// Score multiplier per tier index (exact, simplified, generalized,
    /// cross-database, branded supplement).
    #[serde(default = "MatchConfig::default_tier_boosts")]
    pub tier_boosts: Vec<f64>,
    /// Categories added to a filter when the generalized tier widens it.
    #[serde(default = "MatchConfig::default_widening_rules")]
    pub widening_rules: BTreeMap<Category, Vec<Category>>,
    #[serde(default)]
    pub similarity: SimilarityWeights,
    /// Result budget when the caller passes zero.
    #[serde(default = "MatchConfig::default_max_results")]
    pub default_max_results: usize,
    /// Cap on branded records merged into a weak dish search.
    #[serde(default = "MatchConfig::default_branded_supplement_cap")]
    pub branded_supplement_cap: usize,
    /// Candidates requested from each backend per call.
    #[serde(default = "MatchConfig::default_fetch_limit")]
    pub fetch_limit: usize,
    /// Hard cap on alternates in a result.
    #[serde(default = "MatchConfig::default_result_limit")]
    pub result_limit: usize,
    /// Per-call budget, further bounded by the search deadline.
    #[serde(
        default = "MatchConfig::default_backend_timeout",
        with = "index::serde_millis",
        rename = "backend_timeout_ms"
    )]
    pub backend_timeout: Duration,
    #[serde(default = "MatchConfig::default_connector_words")]
    pub connector_words: Vec<String>,
    #[serde(default = "MatchConfig::default_modifier_words")]
    pub modifier_words: Vec<String>,
    /// Normalizer settings used by `search_text`.
    #[serde(default)]
    pub normalizer: NormalizeConfig,
}

impl MatchConfig {
    pub(crate) fn default_version() -> u32 {
        1
    }

    pub(crate) fn default_min_score_threshold() -> f64 {
        20.0
    }

    pub(crate) fn default_tier_boosts() -> Vec<f64> {
        vec![1.2, 1.1, 1.0, 0.9, 0.9]
    }

    pub(crate) fn default_widening_rules() -> BTreeMap<Category, Vec<Category>> {
        BTreeMap::from([
            (Category::Dish, vec![Category::Dish, Category::Other]),
            (
                Category::Ingredient,
                vec![Category::Ingredient, Category::BrandedProduct],
            ),
            (
                Category::BrandedProduct,
                vec![Category::BrandedProduct, Category::Ingredient],
            ),
            (
                Category::Other,
                vec![Category::Other, Category::Dish, Category::Ingredient],
            ),
        ])
    }

    pub(crate) fn default_max_results() -> usize {
        5
    }

    pub(crate) fn default_branded_supplement_cap() -> usize {
        3
    }

    pub(crate) fn default_fetch_limit() -> usize {
        10
    }

    pub(crate) fn default_result_limit() -> usize {
        15
    }

    pub(crate) fn default_backend_timeout() -> Duration {
        Duration::from_secs(2)
    }

    pub(crate) fn default_connector_words() -> Vec<String> {
        DEFAULT_CONNECTOR_WORDS.iter().map(|s| s.to_string()).collect()
    }

    pub(crate) fn default_modifier_words() -> Vec<String> {
        DEFAULT_MODIFIER_WORDS.iter().map(|s| s.to_string()).collect()
    }

    pub fn with_primary_source(mut self, source: impl Into<SourceId>) -> Self {
        self.primary_source = Some(source.into());
        self
    }

    pub fn with_source_priority(mut self, priority: Vec<SourceId>) -> Self {
        self.source_priority = priority;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.min_score_threshold = threshold;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Boost for a tier index; 1.0 past the configured list.
    pub fn tier_boost(&self, tier_index: usize) -> f64 {
        self.tier_boosts.get(tier_index).copied().unwrap_or(1.0)
    }

    /// Validate the configuration before building an engine.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.version == 0 {
            return Err(MatchError::InvalidConfig(
                "config.version must be >= 1".into(),
            ));
        }
        if !self.min_score_threshold.is_finite() || self.min_score_threshold < 0.0 {
            return Err(MatchError::InvalidConfig(
                "min_score_threshold must be a finite value >= 0.0".into(),
            ));
        }
        if self.tier_boosts.len() != 5 {
            return Err(MatchError::InvalidConfig(
                "tier_boosts must list one boost per tier (5 entries)".into(),
            ));
        }
        if self
            .tier_boosts
            .iter()
            .any(|boost| !boost.is_finite() || *boost <= 0.0)
        {
            return Err(MatchError::InvalidConfig(
                "tier_boosts must be finite values > 0.0".into(),
            ));
        }
        self.similarity.validate()?;
        if self.default_max_results == 0 {
            return Err(MatchError::InvalidConfig(
                "default_max_results must be greater than zero".into(),
            ));
        }
        if self.fetch_limit == 0 {
            return Err(MatchError::InvalidConfig(
                "fetch_limit must be greater than zero".into(),
            ));
        }
        if self.result_limit == 0 {
            return Err(MatchError::InvalidConfig(
                "result_limit must be greater than zero".into(),
            ));
        }
        if self.backend_timeout.is_zero() {
            return Err(MatchError::InvalidConfig(
                "backend_timeout must be greater than zero".into(),
            ));
        }
        if self
            .connector_words
            .iter()
            .chain(self.modifier_words.iter())
            .any(|w| w.trim().is_empty())
        {
            return Err(MatchError::InvalidConfig(
                "connector_words and modifier_words must not contain empty entries".into(),
            ));
        }
        self.normalizer
            .validate()
            .map_err(|err| MatchError::InvalidConfig(err.to_string()))
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            min_score_threshold: Self::default_min_score_threshold(),
            primary_source: None,
            source_priority: Vec::new(),
            tier_boosts: Self::default_tier_boosts(),
            widening_rules: Self::default_widening_rules(),
            similarity: SimilarityWeights::default(),
            default_max_results: Self::default_max_results(),
            branded_supplement_cap: Self::default_branded_supplement_cap(),
            fetch_limit: Self::default_fetch_limit(),
            result_limit: Self::default_result_limit(),
            backend_timeout: Self::default_backend_timeout(),
            connector_words: Self::default_connector_words(),
            modifier_words: Self::default_modifier_words(),
            normalizer: NormalizeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_invalid(cfg: MatchConfig, needle: &str) {
        match cfg.validate().expect_err("config should be invalid") {
            MatchError::InvalidConfig(msg) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = MatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.min_score_threshold, 20.0);
        assert_eq!(cfg.tier_boost(0), 1.2);
        assert_eq!(cfg.tier_boost(9), 1.0);
    }

    #[test]
    fn negative_threshold_rejected() {
        expect_invalid(MatchConfig::default().with_threshold(-1.0), "min_score_threshold");
    }

    #[test]
    fn tier_boost_count_enforced() {
        let cfg = MatchConfig {
            tier_boosts: vec![1.0, 1.0],
            ..Default::default()
        };
        expect_invalid(cfg, "tier_boosts");
    }

    #[test]
    fn invalid_weights_rejected() {
        let cfg = MatchConfig {
            similarity: SimilarityWeights {
                jaro_winkler: f64::NAN,
                ..Default::default()
            },
            ..Default::default()
        };
        expect_invalid(cfg, "jaro_winkler");

        let cfg = MatchConfig {
            similarity: SimilarityWeights {
                jaro_winkler: 0.0,
                levenshtein: 0.0,
                ratio: 0.0,
                partial_ratio: 0.0,
                brand_bonus: 0.3,
            },
            ..Default::default()
        };
        expect_invalid(cfg, "positive");
    }

    #[test]
    fn zero_timeout_rejected() {
        expect_invalid(
            MatchConfig::default().with_backend_timeout(Duration::ZERO),
            "backend_timeout",
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: MatchConfig =
            serde_json::from_str(r#"{"primary_source":"usda","backend_timeout_ms":750}"#)
                .expect("parse config");
        assert_eq!(cfg.primary_source, Some(SourceId::new("usda")));
        assert_eq!(cfg.backend_timeout, Duration::from_millis(750));
        assert_eq!(cfg.fetch_limit, 10);
        assert_eq!(
            cfg.widening_rules.get(&Category::Ingredient),
            Some(&vec![Category::Ingredient, Category::BrandedProduct])
        );
    }
}
