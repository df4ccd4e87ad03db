//! Fallback policy: which databases each tier reaches and how supplementary
//! results are budgeted, per query granularity.

use canonical::{Category, Granularity};
use index::{SearchTier, SourceId, TierKind};

use crate::config::MatchConfig;
use crate::federation::{Lane, LaneOutcome};
use crate::tiers::TierPlanContext;
use crate::types::{LaneRole, StrategyPath};

/// Decides lanes and budgets from the primary/secondary database split.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    primary: SourceId,
    secondaries: Vec<SourceId>,
    fetch_limit: usize,
    branded_supplement_cap: usize,
}

impl FallbackPolicy {
    pub fn new(primary: SourceId, secondaries: Vec<SourceId>, config: &MatchConfig) -> Self {
        Self {
            primary,
            secondaries,
            fetch_limit: config.fetch_limit,
            branded_supplement_cap: config.branded_supplement_cap,
        }
    }

    pub fn primary(&self) -> &SourceId {
        &self.primary
    }

    pub fn path_for(&self, granularity: Granularity) -> StrategyPath {
        match granularity {
            Granularity::Dish => StrategyPath::DishCascade,
            Granularity::Ingredient => StrategyPath::IngredientFederation,
            Granularity::BrandedProduct => StrategyPath::BrandedCascade,
        }
    }

    pub fn plan_context(&self, path: StrategyPath) -> TierPlanContext {
        let cascade_sources = match path {
            StrategyPath::IngredientFederation => std::iter::once(self.primary.clone())
                .chain(self.secondaries.iter().cloned())
                .collect(),
            StrategyPath::DishCascade | StrategyPath::BrandedCascade => vec![self.primary.clone()],
        };
        TierPlanContext {
            cascade_sources,
            secondary_sources: self.secondaries.clone(),
        }
    }

    /// Whether a weak cascade is followed by a branded supplement tier.
    pub fn wants_branded_supplement(&self, path: StrategyPath) -> bool {
        path == StrategyPath::DishCascade && self.branded_supplement_cap > 0
    }

    /// Lanes to run for `tier`, in a fixed order (the merge order).
    pub fn lanes(&self, path: StrategyPath, tier: &SearchTier, max_results: usize) -> Vec<Lane> {
        let wide_fetch = self.fetch_limit.max(max_results);
        match tier.kind {
            TierKind::BrandedSupplement => vec![Lane {
                source: self.primary.clone(),
                tier: tier.with_category_filter(vec![Category::BrandedProduct]),
                fetch: self.branded_supplement_cap,
                role: LaneRole::Branded,
            }],
            TierKind::CrossDatabase => self
                .hinted(tier)
                .into_iter()
                .map(|source| Lane {
                    source,
                    tier: tier.clone(),
                    fetch: wide_fetch,
                    role: LaneRole::CrossDatabase,
                })
                .collect(),
            TierKind::Exact | TierKind::Simplified | TierKind::Generalized => match path {
                StrategyPath::IngredientFederation => {
                    let mut lanes = vec![Lane {
                        source: self.primary.clone(),
                        tier: tier.clone(),
                        fetch: max_results,
                        role: LaneRole::Primary,
                    }];
                    for source in self.hinted(tier) {
                        if source == self.primary {
                            continue;
                        }
                        lanes.push(Lane {
                            source,
                            tier: tier.clone(),
                            fetch: self.fetch_limit,
                            role: LaneRole::SecondaryDatabase,
                        });
                    }
                    lanes.push(Lane {
                        source: self.primary.clone(),
                        tier: tier.with_category_filter(vec![Category::BrandedProduct]),
                        fetch: self.fetch_limit,
                        role: LaneRole::Branded,
                    });
                    lanes
                }
                StrategyPath::DishCascade | StrategyPath::BrandedCascade => self
                    .hinted(tier)
                    .into_iter()
                    .map(|source| Lane {
                        source,
                        tier: tier.clone(),
                        fetch: wide_fetch,
                        role: LaneRole::Primary,
                    })
                    .collect(),
            },
        }
    }

    /// Cap every supplementary lane to a fair share of what the primary lane
    /// left of the result budget: `ceil((max_results - primary_hits) / lanes)`.
    pub fn cap_supplementary(
        &self,
        path: StrategyPath,
        lanes: &mut [LaneOutcome],
        max_results: usize,
    ) {
        if path != StrategyPath::IngredientFederation {
            return;
        }
        let supplementary = lanes.iter().filter(|l| l.role.is_supplementary()).count();
        if supplementary == 0 {
            return;
        }
        let primary_hits: usize = lanes
            .iter()
            .filter(|l| l.role == LaneRole::Primary)
            .map(|l| l.candidates.len())
            .sum();
        let remaining = max_results.saturating_sub(primary_hits);
        let share = remaining.div_ceil(supplementary);
        for lane in lanes.iter_mut().filter(|l| l.role.is_supplementary()) {
            lane.candidates.truncate(share);
        }
    }

    fn hinted(&self, tier: &SearchTier) -> Vec<SourceId> {
        match tier.source_hint.sources() {
            Some(sources) => sources.to_vec(),
            None => std::iter::once(self.primary.clone())
                .chain(self.secondaries.iter().cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendCall, CallOutcome, MatchCandidate};
    use index::{FoodRecord, SourceHint};
    use std::time::Duration;

    fn policy() -> FallbackPolicy {
        FallbackPolicy::new(
            SourceId::new("usda"),
            vec![SourceId::new("off"), SourceId::new("fndds")],
            &MatchConfig::default(),
        )
    }

    fn tier(kind: TierKind, hint: SourceHint) -> SearchTier {
        SearchTier {
            tier_index: kind.index(),
            kind,
            query_string: "chicken breast".into(),
            category_filter: vec![Category::Ingredient],
            backend_score_boost: 1.0,
            source_hint: hint,
            excluded_terms: Vec::new(),
        }
    }

    fn outcome(role: LaneRole, hits: usize) -> LaneOutcome {
        let candidates = (0..hits)
            .map(|i| MatchCandidate {
                record: FoodRecord::new(format!("{role:?}-{i}"), "food", Category::Ingredient),
                tier_index: 0,
                backend_raw_score: 10.0,
                similarity_score: 0.0,
                combined_score: 10.0,
                strategy_tag: role.tag().into(),
            })
            .collect();
        LaneOutcome {
            role,
            candidates,
            call: BackendCall {
                tier_index: 0,
                source: SourceId::new("usda"),
                role,
                category_filter: Vec::new(),
                outcome: CallOutcome::Ok { hits },
                elapsed: Duration::ZERO,
            },
            failure: None,
        }
    }

    #[test]
    fn granularity_selects_path() {
        let p = policy();
        assert_eq!(p.path_for(Granularity::Dish), StrategyPath::DishCascade);
        assert_eq!(p.path_for(Granularity::Ingredient), StrategyPath::IngredientFederation);
        assert_eq!(p.path_for(Granularity::BrandedProduct), StrategyPath::BrandedCascade);
    }

    #[test]
    fn ingredient_cascade_covers_every_database() {
        let ctx = policy().plan_context(StrategyPath::IngredientFederation);
        assert_eq!(ctx.cascade_sources.len(), 3);
        let dish = policy().plan_context(StrategyPath::DishCascade);
        assert_eq!(dish.cascade_sources, vec![SourceId::new("usda")]);
    }

    #[test]
    fn ingredient_tier_fans_out_to_primary_secondaries_and_branded() {
        let p = policy();
        let hint = SourceHint::Sources(p.plan_context(StrategyPath::IngredientFederation).cascade_sources);
        let lanes = p.lanes(StrategyPath::IngredientFederation, &tier(TierKind::Exact, hint), 5);
        let roles: Vec<(LaneRole, &str)> =
            lanes.iter().map(|l| (l.role, l.source.as_str())).collect();
        assert_eq!(
            roles,
            vec![
                (LaneRole::Primary, "usda"),
                (LaneRole::SecondaryDatabase, "off"),
                (LaneRole::SecondaryDatabase, "fndds"),
                (LaneRole::Branded, "usda"),
            ]
        );
        assert_eq!(lanes[0].fetch, 5);
        assert_eq!(lanes[3].tier.category_filter, vec![Category::BrandedProduct]);
    }

    #[test]
    fn dish_tier_stays_on_primary() {
        let p = policy();
        let hint = SourceHint::Sources(vec![SourceId::new("usda")]);
        let lanes = p.lanes(StrategyPath::DishCascade, &tier(TierKind::Simplified, hint), 5);
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].role, LaneRole::Primary);
        assert_eq!(lanes[0].fetch, 10);
    }

    #[test]
    fn supplement_lane_is_capped() {
        let p = policy();
        let t = tier(TierKind::BrandedSupplement, SourceHint::Sources(vec![SourceId::new("usda")]));
        let lanes = p.lanes(StrategyPath::DishCascade, &t, 5);
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].fetch, 3);
        assert!(p.wants_branded_supplement(StrategyPath::DishCascade));
        assert!(!p.wants_branded_supplement(StrategyPath::IngredientFederation));
    }

    #[test]
    fn supplementary_lanes_share_remaining_budget() {
        let p = policy();
        let mut lanes = vec![
            outcome(LaneRole::Primary, 2),
            outcome(LaneRole::SecondaryDatabase, 10),
            outcome(LaneRole::Branded, 10),
        ];
        p.cap_supplementary(StrategyPath::IngredientFederation, &mut lanes, 5);
        // remaining = 3, two lanes -> ceil(3 / 2) = 2 each
        assert_eq!(lanes[0].candidates.len(), 2);
        assert_eq!(lanes[1].candidates.len(), 2);
        assert_eq!(lanes[2].candidates.len(), 2);
    }

    #[test]
    fn primary_filling_budget_leaves_nothing_for_supplements() {
        let p = policy();
        let mut lanes = vec![
            outcome(LaneRole::Primary, 5),
            outcome(LaneRole::SecondaryDatabase, 4),
        ];
        p.cap_supplementary(StrategyPath::IngredientFederation, &mut lanes, 5);
        assert_eq!(lanes[0].candidates.len(), 5);
        assert!(lanes[1].candidates.is_empty());
    }
}
