//! Tier generation: one query, a cascade of progressively broader variants.
//!
//! Every emitted tier is a strict relaxation of the previous emitted one:
//! its words are a subset of the previous words, its category filter is a
//! superset of the previous filter, and it drops a word, widens the filter
//! or reaches a backend the previous tier did not. Variants that fail this
//! check, or that come out empty, are skipped; tier indices stay tied to
//! the tier kind, so a cascade may read 0, 2, 3.

use std::collections::{BTreeMap, BTreeSet};

use canonical::{normalize_text, tokenize, Category, Query};
use index::{SearchTier, SourceHint, SourceId, TierKind};

use crate::config::MatchConfig;

/// Databases the policy wants the cascade (tiers 0 to 2) to run on, and
/// the remaining ones available to the cross-database tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierPlanContext {
    pub cascade_sources: Vec<SourceId>,
    pub secondary_sources: Vec<SourceId>,
}

/// Builds the tier cascade for a query. Pure and deterministic.
#[derive(Debug, Clone)]
pub struct TierGenerator {
    connectors: BTreeSet<String>,
    modifiers: BTreeSet<String>,
    widening_rules: BTreeMap<Category, Vec<Category>>,
    tier_boosts: BTreeMap<TierKind, f64>,
}

impl TierGenerator {
    pub fn new(config: &MatchConfig) -> Self {
        let normalize_all = |list: &[String]| -> BTreeSet<String> {
            list.iter()
                .map(|w| normalize_text(w, false))
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            connectors: normalize_all(&config.connector_words),
            modifiers: normalize_all(&config.modifier_words),
            widening_rules: config.widening_rules.clone(),
            tier_boosts: [
                TierKind::Exact,
                TierKind::Simplified,
                TierKind::Generalized,
                TierKind::CrossDatabase,
                TierKind::BrandedSupplement,
            ]
            .into_iter()
            .map(|kind| (kind, config.tier_boost(kind.index())))
            .collect(),
        }
    }

    pub fn generate(&self, query: &Query, ctx: &TierPlanContext) -> Vec<SearchTier> {
        let cascade_hint = SourceHint::Sources(ctx.cascade_sources.clone());
        let mut tiers: Vec<SearchTier> = Vec::with_capacity(4);

        let exact = self.tier(
            TierKind::Exact,
            query.raw_term.clone(),
            query.preferred_categories.clone(),
            cascade_hint.clone(),
            query,
        );
        self.push_if_relaxed(&mut tiers, exact);

        let core = self.cut_at_connector(&query.raw_term);
        let simplified = self.simplify(&core);
        let simplified_tier = self.tier(
            TierKind::Simplified,
            simplified,
            query.preferred_categories.clone(),
            cascade_hint.clone(),
            query,
        );
        self.push_if_relaxed(&mut tiers, simplified_tier);

        let head = self.head_noun(&core);
        let widened = self.widen(&query.preferred_categories);
        let generalized = self.tier(TierKind::Generalized, head, widened, cascade_hint, query);
        self.push_if_relaxed(&mut tiers, generalized);

        let cross_sources: Vec<SourceId> = ctx
            .secondary_sources
            .iter()
            .filter(|s| !ctx.cascade_sources.contains(s))
            .cloned()
            .collect();
        if !cross_sources.is_empty() {
            if let Some(last) = tiers.last() {
                let cross = self.tier(
                    TierKind::CrossDatabase,
                    last.query_string.clone(),
                    last.category_filter.clone(),
                    SourceHint::Sources(cross_sources),
                    query,
                );
                self.push_if_relaxed(&mut tiers, cross);
            }
        }

        tiers
    }

    /// Supplementary tier searching branded records of `source` with the
    /// query of the last cascade tier.
    pub fn branded_supplement(&self, last: &SearchTier, source: &SourceId) -> SearchTier {
        let kind = TierKind::BrandedSupplement;
        SearchTier {
            tier_index: kind.index(),
            kind,
            query_string: last.query_string.clone(),
            category_filter: vec![Category::BrandedProduct],
            backend_score_boost: self.boost(kind),
            source_hint: SourceHint::Sources(vec![source.clone()]),
            excluded_terms: last.excluded_terms.clone(),
        }
    }

    fn tier(
        &self,
        kind: TierKind,
        query_string: String,
        category_filter: Vec<Category>,
        source_hint: SourceHint,
        query: &Query,
    ) -> SearchTier {
        SearchTier {
            tier_index: kind.index(),
            kind,
            query_string,
            category_filter,
            backend_score_boost: self.boost(kind),
            source_hint,
            excluded_terms: query.excluded_terms.clone(),
        }
    }

    fn boost(&self, kind: TierKind) -> f64 {
        self.tier_boosts.get(&kind).copied().unwrap_or(1.0)
    }

    fn push_if_relaxed(&self, tiers: &mut Vec<SearchTier>, candidate: SearchTier) {
        if candidate.query_string.trim().is_empty() || candidate.required_words().is_empty() {
            return;
        }
        let accepted = match tiers.last() {
            None => true,
            Some(previous) => is_strict_relaxation(previous, &candidate),
        };
        if accepted {
            tiers.push(candidate);
        }
    }

    fn is_connector(&self, token: &str) -> bool {
        self.connectors.contains(&normalize_text(token, false))
    }

    fn is_modifier(&self, token: &str) -> bool {
        self.modifiers.contains(&normalize_text(token, false))
    }

    /// Literal text up to the first connector word. A leading connector is
    /// kept, since cutting there would leave nothing.
    fn cut_at_connector(&self, literal: &str) -> String {
        let tokens = tokenize(literal);
        let cut = tokens
            .iter()
            .skip(1)
            .find(|t| self.is_connector(&t.text))
            .map(|t| t.start)
            .unwrap_or(literal.len());
        trim_separators(&literal[..cut]).to_string()
    }

    /// Drop the last comma segment when there are at least two; otherwise
    /// drop modifier words.
    fn simplify(&self, core: &str) -> String {
        let segments = comma_segments(core);
        if segments.len() >= 2 {
            return segments[..segments.len() - 1].join(", ");
        }
        let kept: Vec<String> = tokenize(core)
            .into_iter()
            .filter(|t| !self.is_modifier(&t.text))
            .map(|t| trim_separators(&t.text).to_string())
            .filter(|t| !t.is_empty())
            .collect();
        kept.join(" ")
    }

    /// First non-modifier word of the first segment for "Potatoes, mashed"
    /// style descriptors, last non-modifier word for free text. Falls back to
    /// the first or last word when every word is a modifier.
    fn head_noun(&self, core: &str) -> String {
        let segments = comma_segments(core);
        let head_first = segments.len() >= 2;
        let scope = if head_first { segments[0] } else { core };
        let words: Vec<String> = tokenize(scope)
            .into_iter()
            .map(|t| trim_separators(&t.text).to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let is_head = |w: &&String| !self.is_modifier(w) && !self.is_connector(w);
        let head = if head_first {
            words.iter().find(is_head).or_else(|| words.first())
        } else {
            words.iter().rev().find(is_head).or_else(|| words.last())
        };
        head.cloned().unwrap_or_default()
    }

    fn widen(&self, filter: &[Category]) -> Vec<Category> {
        let mut out: Vec<Category> = filter.to_vec();
        for category in filter {
            if let Some(extra) = self.widening_rules.get(category) {
                for c in extra {
                    if !out.contains(c) {
                        out.push(*c);
                    }
                }
            }
        }
        out
    }
}

/// True when `next` narrows nothing relative to `previous` and relaxes at
/// least one of: words, category filter, targeted backends.
pub fn is_strict_relaxation(previous: &SearchTier, next: &SearchTier) -> bool {
    let prev_words: BTreeSet<String> = previous.required_words().into_iter().collect();
    let next_words: BTreeSet<String> = next.required_words().into_iter().collect();
    if !next_words.is_subset(&prev_words) {
        return false;
    }

    let filter_widened = match (
        previous.category_filter.is_empty(),
        next.category_filter.is_empty(),
    ) {
        (true, true) => false,
        (true, false) => return false,
        (false, true) => true,
        (false, false) => {
            if !previous
                .category_filter
                .iter()
                .all(|c| next.category_filter.contains(c))
            {
                return false;
            }
            next.category_filter
                .iter()
                .any(|c| !previous.category_filter.contains(c))
        }
    };

    let fewer_words = next_words.len() < prev_words.len();
    let new_backends = match (previous.source_hint.sources(), next.source_hint.sources()) {
        (Some(prev), Some(next)) => next.iter().any(|s| !prev.contains(s)),
        (Some(_), None) => true,
        (None, _) => false,
    };

    fewer_words || filter_widened || new_backends
}

fn comma_segments(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn trim_separators(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{normalize_query, Granularity, NormalizeConfig, QueryHints};

    fn query(raw: &str, granularity: Granularity) -> Query {
        normalize_query(
            raw,
            &QueryHints::with_granularity(granularity),
            &NormalizeConfig::default(),
        )
        .expect("valid query")
    }

    fn ctx(cascade: &[&str], secondary: &[&str]) -> TierPlanContext {
        TierPlanContext {
            cascade_sources: cascade.iter().map(|s| SourceId::new(*s)).collect(),
            secondary_sources: secondary.iter().map(|s| SourceId::new(*s)).collect(),
        }
    }

    fn generator() -> TierGenerator {
        TierGenerator::new(&MatchConfig::default())
    }

    #[test]
    fn comma_descriptor_cascade() {
        let q = query("Potatoes, mashed, prepared", Granularity::Ingredient);
        let tiers = generator().generate(&q, &ctx(&["usda"], &["off"]));

        let summary: Vec<(usize, &str)> = tiers
            .iter()
            .map(|t| (t.tier_index, t.query_string.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "Potatoes, mashed, prepared"),
                (1, "Potatoes, mashed"),
                (2, "Potatoes"),
                (3, "Potatoes"),
            ]
        );
        assert_eq!(tiers[0].category_filter, vec![Category::Ingredient]);
        assert_eq!(
            tiers[2].category_filter,
            vec![Category::Ingredient, Category::BrandedProduct]
        );
        assert_eq!(tiers[3].source_hint, SourceHint::Sources(vec![SourceId::new("off")]));
        assert_eq!(tiers[0].backend_score_boost, 1.2);
    }

    #[test]
    fn head_noun_skips_leading_cooking_words() {
        let q = query("Fried chicken, thigh", Granularity::Ingredient);
        let tiers = generator().generate(&q, &ctx(&["usda"], &[]));
        let summary: Vec<(usize, &str)> = tiers
            .iter()
            .map(|t| (t.tier_index, t.query_string.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "Fried chicken, thigh"),
                (1, "Fried chicken"),
                (2, "chicken"),
            ]
        );

        let q = query("Grilled chicken, breast", Granularity::Ingredient);
        let tiers = generator().generate(&q, &ctx(&["usda"], &[]));
        let generalized = tiers
            .iter()
            .find(|t| t.kind == TierKind::Generalized)
            .expect("generalized tier");
        assert_eq!(generalized.query_string, "chicken");
    }

    #[test]
    fn head_noun_falls_back_when_every_word_is_a_modifier() {
        let q = query("Fried, grilled", Granularity::Ingredient);
        let tiers = generator().generate(&q, &ctx(&["usda"], &[]));
        assert_eq!(tiers[0].query_string, "Fried, grilled");
        assert!(tiers.iter().all(|t| !t.query_string.is_empty()));
    }

    #[test]
    fn boosts_follow_match_config() {
        let config = MatchConfig {
            tier_boosts: vec![2.0, 1.5, 1.25, 0.5, 0.75],
            ..MatchConfig::default()
        };
        let q = query("Potatoes, mashed, prepared", Granularity::Dish);
        let tiers = TierGenerator::new(&config).generate(&q, &ctx(&["usda"], &["off"]));
        for tier in &tiers {
            assert_eq!(tier.backend_score_boost, config.tier_boost(tier.tier_index));
        }
        let supplement = TierGenerator::new(&config)
            .branded_supplement(&tiers[0], &SourceId::new("usda"));
        assert_eq!(supplement.backend_score_boost, 0.75);
    }

    #[test]
    fn connector_cuts_trailing_phrase() {
        let q = query("Grilled chicken breast with lemon", Granularity::Dish);
        let tiers = generator().generate(&q, &ctx(&["usda"], &[]));
        assert_eq!(tiers[1].query_string, "chicken breast");
        assert_eq!(tiers[2].query_string, "breast");
        assert_eq!(tiers[2].category_filter, vec![Category::Dish, Category::Other]);
    }

    #[test]
    fn single_word_skips_simplified_tier() {
        let q = query("meatloaf", Granularity::Dish);
        let tiers = generator().generate(&q, &ctx(&["usda"], &[]));
        let indices: Vec<usize> = tiers.iter().map(|t| t.tier_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn no_secondary_sources_means_no_cross_tier() {
        let q = query("chicken breast", Granularity::Ingredient);
        let tiers = generator().generate(&q, &ctx(&["usda", "off"], &["off"]));
        assert!(tiers.iter().all(|t| t.kind != TierKind::CrossDatabase));
    }

    #[test]
    fn empty_filter_cannot_be_widened() {
        let mut q = query("rice", Granularity::Ingredient);
        q.preferred_categories.clear();
        let tiers = generator().generate(&q, &ctx(&["usda"], &[]));
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].kind, TierKind::Exact);
    }

    #[test]
    fn generation_is_deterministic() {
        let q = query("Fried chicken, thigh, with skin", Granularity::Dish);
        let g = generator();
        let c = ctx(&["usda"], &["off"]);
        assert_eq!(g.generate(&q, &c), g.generate(&q, &c));
    }

    #[test]
    fn every_tier_relaxes_the_previous() {
        let q = query("Beef stew, canned, with vegetables", Granularity::Dish);
        let tiers = generator().generate(&q, &ctx(&["usda"], &["off", "fndds"]));
        for pair in tiers.windows(2) {
            assert!(is_strict_relaxation(&pair[0], &pair[1]));
            assert!(pair[0].tier_index < pair[1].tier_index);
        }
    }

    #[test]
    fn branded_supplement_targets_primary() {
        let q = query("lasagna", Granularity::Dish);
        let g = generator();
        let tiers = g.generate(&q, &ctx(&["usda"], &[]));
        let last = tiers.last().expect("at least tier 0");
        let supplement = g.branded_supplement(last, &SourceId::new("usda"));
        assert_eq!(supplement.tier_index, 4);
        assert_eq!(supplement.category_filter, vec![Category::BrandedProduct]);
        assert_eq!(supplement.query_string, last.query_string);
    }
}
