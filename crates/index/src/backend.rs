use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::BackendError;
use crate::record::{FoodRecord, SourceId};
use crate::tier::SearchTier;

/// A record returned by a backend with its native relevance score.
///
/// Scores are in the backend's own units (Elasticsearch-like for the
/// shipped stores); the engine applies the tier boost on top.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawCandidate {
    pub record: FoodRecord,
    pub score: f64,
}

impl RawCandidate {
    pub fn new(record: FoodRecord, score: f64) -> Self {
        Self { record, score }
    }
}

/// Trait for one nutrition-record store.
///
/// Implementations translate the tier's category filter into their native
/// representation, set `source_database` on every record they return and
/// should give up once `deadline` passes. The engine enforces the deadline
/// as well and discards late results.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Database this adapter serves.
    fn source(&self) -> &SourceId;

    /// Run one tier's query, returning at most `max_results` candidates.
    async fn search(
        &self,
        tier: &SearchTier,
        max_results: usize,
        deadline: Instant,
    ) -> Result<Vec<RawCandidate>, BackendError>;
}

#[async_trait]
impl<T: BackendAdapter + ?Sized> BackendAdapter for Arc<T> {
    fn source(&self) -> &SourceId {
        (**self).source()
    }

    async fn search(
        &self,
        tier: &SearchTier,
        max_results: usize,
        deadline: Instant,
    ) -> Result<Vec<RawCandidate>, BackendError> {
        (**self).search(tier, max_results, deadline).await
    }
}
