//! Similarity re-ranking.
//!
//! Fuses four string-similarity signals between the normalized query and a
//! candidate's names into one score in `[0, 1]`, then folds it into the
//! backend score: `combined = backend_raw_score * (1 + similarity)`.
//! Re-ranking only rescores; it never adds or removes candidates.

use canonical::{contains_phrase, normalize_text, words, Query};

use crate::config::SimilarityWeights;
use crate::types::MatchCandidate;

/// Scores candidates against a query with fixed weights.
#[derive(Debug, Clone)]
pub struct Reranker {
    weights: SimilarityWeights,
    stem: bool,
}

impl Reranker {
    /// `stem` must match the normalizer setting that produced the query's
    /// `normalized_term`, so both sides are compared in the same form.
    pub fn new(weights: SimilarityWeights, stem: bool) -> Self {
        Self { weights, stem }
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    /// Fill `similarity_score` and `combined_score` of every candidate.
    pub fn rescore(&self, query: &Query, candidates: &mut [MatchCandidate]) {
        for candidate in candidates.iter_mut() {
            let similarity = self.similarity(query, candidate);
            candidate.similarity_score = similarity;
            candidate.combined_score = candidate.backend_raw_score * (1.0 + similarity);
        }
    }

    /// Best signal blend over the display name and aliases, plus the brand
    /// bonus, clamped to `[0, 1]`.
    pub fn similarity(&self, query: &Query, candidate: &MatchCandidate) -> f64 {
        let best = candidate
            .record
            .names()
            .map(|name| self.blend(&query.normalized_term, &normalize_text(name, self.stem)))
            .fold(0.0_f64, f64::max);

        let bonus = if brand_in_name(query, &candidate.record.display_name) {
            self.weights.brand_bonus
        } else {
            0.0
        };
        (best + bonus).clamp(0.0, 1.0)
    }

    fn blend(&self, a: &str, b: &str) -> f64 {
        let w = &self.weights;
        w.jaro_winkler * strsim::jaro_winkler(a, b)
            + w.levenshtein * strsim::normalized_levenshtein(a, b)
            + w.ratio * ratio(a, b)
            + w.partial_ratio * partial_ratio(a, b)
    }
}

fn brand_in_name(query: &Query, display_name: &str) -> bool {
    if query.brand_tokens.is_empty() {
        return false;
    }
    let normalized = normalize_text(display_name, false);
    let name_words = words(&normalized);
    query.brand_tokens.iter().any(|token| {
        let token_words = words(token);
        contains_phrase(&name_words, &token_words)
    })
}

/// Indel similarity `2 * LCS / (|a| + |b|)` over characters.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against every window of the longer
/// string with the same length.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.is_empty() {
        return if long.is_empty() { 1.0 } else { 0.0 };
    }
    long.windows(short.len())
        .map(|window| ratio_chars(short, window))
        .fold(0.0_f64, f64::max)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{normalize_query, Category, NormalizeConfig, QueryHints};
    use index::FoodRecord;

    fn query(raw: &str) -> Query {
        normalize_query(raw, &QueryHints::default(), &NormalizeConfig::default()).expect("query")
    }

    fn candidate(name: &str, raw: f64) -> MatchCandidate {
        MatchCandidate {
            record: FoodRecord::new(name, name, Category::Ingredient).with_source("usda"),
            tier_index: 0,
            backend_raw_score: raw,
            similarity_score: 0.0,
            combined_score: raw,
            strategy_tag: "primary".into(),
        }
    }

    fn reranker() -> Reranker {
        Reranker::new(SimilarityWeights::default(), true)
    }

    #[test]
    fn ratio_matches_indel_definition() {
        assert_eq!(ratio("abc", "abc"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert!((ratio("abcd", "abxd") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("chicken", "grilled chicken breast"), 1.0);
        assert!(partial_ratio("beef", "chicken") < 1.0);
        assert_eq!(partial_ratio("", "rice"), 0.0);
    }

    #[test]
    fn identical_name_scores_one() {
        let q = query("chicken breast");
        let c = candidate("Chicken breast", 30.0);
        assert!((reranker().similarity(&q, &c) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn closer_names_score_higher() {
        let q = query("chicken breast");
        let close = candidate("Chicken, breast, cooked", 30.0);
        let far = candidate("Beef, ground, raw", 30.0);
        let r = reranker();
        assert!(r.similarity(&q, &close) > r.similarity(&q, &far));
    }

    #[test]
    fn aliases_are_considered() {
        let q = query("soda");
        let plain = candidate("Carbonated beverage, cola", 30.0);
        let aliased = MatchCandidate {
            record: plain.record.clone().with_alias("soda"),
            ..plain.clone()
        };
        let r = reranker();
        assert!(r.similarity(&q, &aliased) > r.similarity(&q, &plain));
    }

    #[test]
    fn brand_bonus_applies_and_is_clamped() {
        let q = query("Kraft macaroni and cheese");
        assert_eq!(q.brand_tokens, vec!["kraft".to_string()]);
        let branded = candidate("Kraft Macaroni and Cheese Dinner", 30.0);
        let generic = candidate("Macaroni and Cheese Dinner", 30.0);
        let r = reranker();
        let with_brand = r.similarity(&q, &branded);
        assert!(with_brand > r.similarity(&q, &generic));
        assert!(with_brand <= 1.0);
    }

    #[test]
    fn rescore_combines_with_backend_score() {
        let q = query("chicken breast");
        let mut candidates = vec![candidate("Chicken breast", 30.0)];
        reranker().rescore(&q, &mut candidates);
        assert!((candidates[0].combined_score - 60.0).abs() < 1e-9);
        assert_eq!(candidates.len(), 1);
    }
}
