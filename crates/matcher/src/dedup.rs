//! Deduplication and the deterministic ranking order.
//!
//! Ranking order, best first:
//! 1. higher `combined_score`
//! 2. lower `tier_index`
//! 3. source priority (listed sources in list order, then unlisted by name)
//! 4. lexicographically smaller `record.id`

use std::cmp::Ordering;
use std::collections::HashMap;

use index::SourceId;

use crate::types::MatchCandidate;

/// Configured tie-break order of databases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePriority {
    order: Vec<SourceId>,
}

impl SourcePriority {
    pub fn new(order: Vec<SourceId>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[SourceId] {
        &self.order
    }

    fn compare(&self, a: &SourceId, b: &SourceId) -> Ordering {
        let pos_a = self.order.iter().position(|s| s == a);
        let pos_b = self.order.iter().position(|s| s == b);
        match (pos_a, pos_b) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}

/// `Ordering::Less` when `a` ranks ahead of `b`.
pub fn ranking_order(a: &MatchCandidate, b: &MatchCandidate, priority: &SourcePriority) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| a.tier_index.cmp(&b.tier_index))
        .then_with(|| priority.compare(a.source(), b.source()))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

/// Sort candidates best first without removing anything.
pub fn rank(candidates: &mut [MatchCandidate], priority: &SourcePriority) {
    candidates.sort_by(|a, b| ranking_order(a, b, priority));
}

/// Keep the best-ranked candidate per `record.id`, best first.
pub fn dedup(candidates: Vec<MatchCandidate>, priority: &SourcePriority) -> Vec<MatchCandidate> {
    let mut best: HashMap<String, MatchCandidate> = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        match best.get(&candidate.record.id) {
            Some(existing) if ranking_order(existing, &candidate, priority) != Ordering::Greater => {}
            _ => {
                best.insert(candidate.record.id.clone(), candidate);
            }
        }
    }
    let mut out: Vec<MatchCandidate> = best.into_values().collect();
    rank(&mut out, priority);
    out
}
