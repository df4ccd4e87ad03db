//! In-process nutrition store.
//!
//! Records are kept in a `RwLock<HashMap>` keyed by id together with the
//! stemmed terms of their display name and aliases. Scoring is lexical and
//! produces numbers in the same range as a full-text engine would (an exact
//! name match scores 50, a name containing every query word scores at
//! least 30), so the default threshold of 20.0 behaves the same against
//! this store as against a remote one.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use canonical::{normalize_text, words};
use tokio::time::Instant;
use tracing::debug;

use crate::backend::{BackendAdapter, RawCandidate};
use crate::error::{BackendError, StoreError};
use crate::record::{FoodRecord, SourceId};
use crate::tier::SearchTier;

const COVERAGE_WEIGHT: f64 = 30.0;
const PRECISION_WEIGHT: f64 = 10.0;
const EXACT_NAME_BONUS: f64 = 10.0;

struct IndexedRecord {
    record: FoodRecord,
    /// Sorted, deduplicated terms per name (display name first).
    fields: Vec<Vec<String>>,
}

impl IndexedRecord {
    fn new(record: FoodRecord) -> Self {
        let fields = record.names().map(terms).collect();
        Self { record, fields }
    }
}

/// An in-memory [`BackendAdapter`].
pub struct InMemoryBackend {
    source: SourceId,
    records: RwLock<HashMap<String, IndexedRecord>>,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
            records: RwLock::new(HashMap::new()),
            latency: None,
        }
    }

    /// Build a store from records, rejecting duplicate ids.
    pub fn from_records(
        source: impl Into<SourceId>,
        records: impl IntoIterator<Item = FoodRecord>,
    ) -> Result<Self, StoreError> {
        let backend = Self::new(source);
        {
            let mut guard = backend
                .records
                .write()
                .map_err(|_| StoreError::Poisoned)?;
            for record in records {
                let record = backend.prepare(record)?;
                if guard.contains_key(&record.id) {
                    return Err(StoreError::DuplicateId(record.id));
                }
                guard.insert(record.id.clone(), IndexedRecord::new(record));
            }
        }
        Ok(backend)
    }

    /// Build a store from a JSON array of [`FoodRecord`]s.
    pub fn from_json_slice(source: impl Into<SourceId>, bytes: &[u8]) -> Result<Self, StoreError> {
        let records: Vec<FoodRecord> = serde_json::from_slice(bytes)?;
        Self::from_records(source, records)
    }

    /// Build a store from a JSON file containing an array of records.
    pub fn from_json_file(
        source: impl Into<SourceId>,
        path: impl AsRef<Path>,
    ) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(source, &bytes)
    }

    /// Simulate a remote store that needs `latency` to answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace a record.
    pub fn upsert(&self, record: FoodRecord) -> Result<(), StoreError> {
        let record = self.prepare(record)?;
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(record.id.clone(), IndexedRecord::new(record));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prepare(&self, mut record: FoodRecord) -> Result<FoodRecord, StoreError> {
        if record.display_name.trim().is_empty() {
            return Err(StoreError::EmptyName(record.id));
        }
        record.source_database = self.source.clone();
        Ok(record)
    }

    fn rank(&self, tier: &SearchTier, max_results: usize) -> Result<Vec<RawCandidate>, BackendError> {
        let query_terms = terms(&tier.query_string);
        if query_terms.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let guard = self
            .records
            .read()
            .map_err(|_| BackendError::unavailable("poisoned lock"))?;

        let mut hits: Vec<RawCandidate> = guard
            .values()
            .filter(|indexed| tier.accepts(indexed.record.category))
            .filter_map(|indexed| {
                let score = indexed
                    .fields
                    .iter()
                    .map(|field| lexical_score(&query_terms, field))
                    .fold(0.0_f64, f64::max);
                (score > 0.0).then(|| RawCandidate::new(indexed.record.clone(), score))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[async_trait]
impl BackendAdapter for InMemoryBackend {
    fn source(&self) -> &SourceId {
        &self.source
    }

    async fn search(
        &self,
        tier: &SearchTier,
        max_results: usize,
        deadline: Instant,
    ) -> Result<Vec<RawCandidate>, BackendError> {
        let started = Instant::now();
        if let Some(latency) = self.latency {
            let ready_at = started + latency;
            if ready_at > deadline {
                tokio::time::sleep_until(deadline).await;
                return Err(BackendError::Timeout(deadline.saturating_duration_since(started)));
            }
            tokio::time::sleep_until(ready_at).await;
        } else if started >= deadline {
            return Err(BackendError::Timeout(Duration::ZERO));
        }

        let hits = self.rank(tier, max_results)?;
        debug!(
            source = %self.source,
            tier = tier.tier_index,
            query = %tier.query_string,
            hits = hits.len(),
            "in-memory search"
        );
        Ok(hits)
    }
}

fn terms(text: &str) -> Vec<String> {
    let normalized = normalize_text(text, true);
    let mut out: Vec<String> = words(&normalized).into_iter().map(str::to_string).collect();
    out.sort();
    out.dedup();
    out
}

/// `30 * coverage^2 + 10 * precision`, plus 10 when the name and the query
/// have exactly the same terms. Zero when no query term matches.
fn lexical_score(query: &[String], field: &[String]) -> f64 {
    if query.is_empty() || field.is_empty() {
        return 0.0;
    }
    let matched = query
        .iter()
        .filter(|term| field.binary_search(*term).is_ok())
        .count();
    if matched == 0 {
        return 0.0;
    }
    let coverage = matched as f64 / query.len() as f64;
    let precision = matched as f64 / field.len() as f64;
    let mut score = COVERAGE_WEIGHT * coverage * coverage + PRECISION_WEIGHT * precision;
    if query == field {
        score += EXACT_NAME_BONUS;
    }
    score
}
