//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use foodmatch::{
    normalize_query, BackendAdapter, BackendError, Category, FoodRecord, MatchConfig,
    NormalizeConfig, Query, QueryHints, RawCandidate, SearchEngine, SearchTier, SourceId,
};
use tokio::time::Instant;

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenCall {
    pub tier_index: usize,
    pub query: String,
    pub filter: Vec<Category>,
}

/// Backend stub answering with canned candidates per tier query string.
///
/// Category filters are honoured, so one stub can serve both the primary
/// and the branded lane of a tier.
pub struct StubBackend {
    source: SourceId,
    responses: HashMap<String, Vec<(FoodRecord, f64)>>,
    delay: Duration,
    failure: Option<BackendError>,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenCall>>,
}

impl StubBackend {
    pub fn new(source: &str) -> Self {
        Self {
            source: SourceId::new(source),
            responses: HashMap::new(),
            delay: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answer `query` with `record` at `score`.
    pub fn with_hit(mut self, query: &str, record: FoodRecord, score: f64) -> Self {
        self.responses
            .entry(query.to_string())
            .or_default()
            .push((record, score));
        self
    }

    /// Sleep before answering; time out against short deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: BackendError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenCall> {
        self.seen.lock().unwrap().clone()
    }

    pub fn tiers_seen(&self) -> Vec<usize> {
        let mut tiers: Vec<usize> = self.seen().iter().map(|c| c.tier_index).collect();
        tiers.dedup();
        tiers
    }
}

#[async_trait]
impl BackendAdapter for StubBackend {
    fn source(&self) -> &SourceId {
        &self.source
    }

    async fn search(
        &self,
        tier: &SearchTier,
        max_results: usize,
        _deadline: Instant,
    ) -> Result<Vec<RawCandidate>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(SeenCall {
            tier_index: tier.tier_index,
            query: tier.query_string.clone(),
            filter: tier.category_filter.clone(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self
            .responses
            .get(&tier.query_string)
            .into_iter()
            .flatten()
            .filter(|(record, _)| tier.accepts(record.category))
            .take(max_results)
            .map(|(record, score)| {
                RawCandidate::new(record.clone().with_source(self.source.clone()), *score)
            })
            .collect())
    }
}

pub fn record(id: &str, name: &str, category: Category) -> FoodRecord {
    FoodRecord::new(id, name, category)
}

pub fn query(raw: &str) -> Query {
    normalize_query(raw, &QueryHints::default(), &NormalizeConfig::default()).unwrap()
}

pub fn engine(adapters: Vec<Arc<StubBackend>>) -> SearchEngine {
    engine_with(adapters, MatchConfig::default())
}

pub fn engine_with(adapters: Vec<Arc<StubBackend>>, config: MatchConfig) -> SearchEngine {
    let adapters: Vec<Arc<dyn BackendAdapter>> = adapters
        .into_iter()
        .map(|a| a as Arc<dyn BackendAdapter>)
        .collect();
    SearchEngine::new(adapters, config).unwrap()
}
