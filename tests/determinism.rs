mod common;

use std::time::Duration;

use common::{engine, query, record, StubBackend};
use foodmatch::{Category, MatchCandidate, MatchResult, SearchMode};

fn ranking(result: &MatchResult) -> Vec<(String, usize, f64, String)> {
    result
        .candidates()
        .map(|c: &MatchCandidate| {
            (
                c.record.id.clone(),
                c.tier_index,
                c.combined_score,
                c.strategy_tag.clone(),
            )
        })
        .collect()
}

fn stores(usda_delay: Duration, off_delay: Duration) -> Vec<std::sync::Arc<StubBackend>> {
    let usda = StubBackend::new("usda")
        .with_hit("white rice", record("u1", "Rice, white, cooked", Category::Ingredient), 18.0)
        .with_hit("white rice", record("u2", "Rice, white, raw", Category::Ingredient), 16.0)
        .with_hit("rice", record("u3", "Rice", Category::Ingredient), 15.0)
        .with_delay(usda_delay)
        .into_arc();
    let off = StubBackend::new("off")
        .with_hit("white rice", record("o1", "White rice", Category::Ingredient), 18.0)
        .with_hit("rice", record("o2", "Rice, white", Category::Ingredient), 14.0)
        .with_delay(off_delay)
        .into_arc();
    vec![usda, off]
}

#[tokio::test(start_paused = true)]
async fn repeated_searches_return_identical_rankings() {
    let engine = engine(stores(Duration::ZERO, Duration::ZERO));
    let q = query("white rice");

    let first = engine.search(&q, SearchMode::Multi, 10, Duration::from_secs(5)).await;
    let second = engine.search(&q, SearchMode::Multi, 10, Duration::from_secs(5)).await;

    assert!(first.best_match.is_some());
    assert_eq!(ranking(&first), ranking(&second));
    assert_eq!(first.strategy.tiers, second.strategy.tiers);
    assert_eq!(first.strategy.states, second.strategy.states);
    assert_eq!(first.status, second.status);
}

#[tokio::test(start_paused = true)]
async fn arrival_order_does_not_change_the_ranking() {
    let q = query("white rice");

    let usda_first = engine(stores(Duration::from_millis(10), Duration::from_millis(200)));
    let off_first = engine(stores(Duration::from_millis(200), Duration::from_millis(10)));

    let a = usda_first.search(&q, SearchMode::Multi, 10, Duration::from_secs(5)).await;
    let b = off_first.search(&q, SearchMode::Multi, 10, Duration::from_secs(5)).await;

    assert_eq!(ranking(&a), ranking(&b));
    let sources_a: Vec<_> = a.strategy.backend_calls.iter().map(|c| c.source.clone()).collect();
    let sources_b: Vec<_> = b.strategy.backend_calls.iter().map(|c| c.source.clone()).collect();
    assert_eq!(sources_a, sources_b);
}

#[tokio::test]
async fn candidates_never_repeat_a_record_id() {
    let engine = engine(stores(Duration::ZERO, Duration::ZERO));
    let result = engine
        .search(&query("white rice"), SearchMode::Multi, 15, Duration::from_secs(5))
        .await;

    let mut ids: Vec<&str> = result.candidates().map(|c| c.record.id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(total > 1);
}
