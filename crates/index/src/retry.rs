//! Retry with exponential backoff as a transport concern of an adapter.
//!
//! The search engine itself never retries. Wrapping an adapter in
//! [`RetryingBackend`] retries transient [`BackendError`]s, but never sleeps
//! past the deadline of the call it is serving.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::backend::{BackendAdapter, RawCandidate};
use crate::error::BackendError;
use crate::record::SourceId;
use crate::tier::SearchTier;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "RetryConfig::default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further one.
    #[serde(
        default = "RetryConfig::default_base_delay",
        with = "crate::serde_millis",
        rename = "base_delay_ms"
    )]
    pub base_delay: Duration,
    #[serde(
        default = "RetryConfig::default_max_delay",
        with = "crate::serde_millis",
        rename = "max_delay_ms"
    )]
    pub max_delay: Duration,
    /// Add up to 50% random jitter to every delay.
    #[serde(default = "RetryConfig::default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            base_delay: Self::default_base_delay(),
            max_delay: Self::default_max_delay(),
            jitter: Self::default_jitter(),
        }
    }
}

impl RetryConfig {
    fn default_max_retries() -> u32 {
        2
    }

    fn default_base_delay() -> Duration {
        Duration::from_millis(50)
    }

    fn default_max_delay() -> Duration {
        Duration::from_millis(500)
    }

    fn default_jitter() -> bool {
        true
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
        let delay = exponential.min(self.max_delay.as_millis() as u64);

        if self.jitter {
            let jitter = fastrand::u64(0..=delay / 2);
            Duration::from_millis(delay + jitter)
        } else {
            Duration::from_millis(delay)
        }
    }
}

/// Adapter decorator that retries transient failures of `inner`.
pub struct RetryingBackend<A> {
    inner: A,
    config: RetryConfig,
}

impl<A: BackendAdapter> RetryingBackend<A> {
    pub fn new(inner: A, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<A: BackendAdapter> BackendAdapter for RetryingBackend<A> {
    fn source(&self) -> &SourceId {
        self.inner.source()
    }

    async fn search(
        &self,
        tier: &SearchTier,
        max_results: usize,
        deadline: Instant,
    ) -> Result<Vec<RawCandidate>, BackendError> {
        let mut attempt = 0;
        loop {
            let err = match self.inner.search(tier, max_results, deadline).await {
                Ok(hits) => return Ok(hits),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.config.max_retries {
                return Err(err);
            }

            let delay = self.config.delay_for(attempt);
            if Instant::now() + delay >= deadline {
                warn!(
                    source = %self.inner.source(),
                    tier = tier.tier_index,
                    attempt,
                    error = %err,
                    "no time left to retry backend call"
                );
                return Err(err);
            }

            debug!(
                source = %self.inner.source(),
                tier = tier.tier_index,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying backend call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FoodRecord;
    use crate::tier::{SourceHint, TierKind};
    use canonical::Category;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with `error`, then returns one hit.
    struct Flaky {
        source: SourceId,
        failures: u32,
        error: BackendError,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32, error: BackendError) -> Self {
            Self {
                source: SourceId::new("flaky"),
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl BackendAdapter for Flaky {
        fn source(&self) -> &SourceId {
            &self.source
        }

        async fn search(
            &self,
            _tier: &SearchTier,
            _max_results: usize,
            _deadline: Instant,
        ) -> Result<Vec<RawCandidate>, BackendError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.error.clone());
            }
            let record = FoodRecord::new("1", "Rice", Category::Ingredient).with_source("flaky");
            Ok(vec![RawCandidate::new(record, 30.0)])
        }
    }

    fn tier() -> SearchTier {
        SearchTier {
            tier_index: 0,
            kind: TierKind::Exact,
            query_string: "rice".into(),
            category_filter: Vec::new(),
            backend_score_boost: 1.2,
            source_hint: SourceHint::All,
            excluded_terms: Vec::new(),
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(false)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let backend = RetryingBackend::new(
            Flaky::new(2, BackendError::unavailable("503")),
            fast_config().with_max_retries(3),
        );
        let deadline = Instant::now() + Duration::from_secs(2);
        let hits = backend.search(&tier(), 5, deadline).await.expect("eventually ok");
        assert_eq!(hits.len(), 1);
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let backend = RetryingBackend::new(
            Flaky::new(10, BackendError::transport("reset")),
            fast_config().with_max_retries(2),
        );
        let deadline = Instant::now() + Duration::from_secs(2);
        let err = backend.search(&tier(), 5, deadline).await.expect_err("still failing");
        assert_eq!(err, BackendError::transport("reset"));
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_requests_are_not_retried() {
        let backend = RetryingBackend::new(
            Flaky::new(1, BackendError::rejected("bad filter")),
            fast_config(),
        );
        let deadline = Instant::now() + Duration::from_secs(2);
        assert!(backend.search(&tier(), 5, deadline).await.is_err());
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn never_sleeps_past_deadline() {
        let backend = RetryingBackend::new(
            Flaky::new(1, BackendError::unavailable("503")),
            fast_config().with_base_delay(Duration::from_millis(500)),
        );
        let deadline = Instant::now() + Duration::from_millis(100);
        assert!(backend.search(&tier(), 5, deadline).await.is_err());
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_jitter(false);
        assert_eq!(cfg.delay_for(0), Duration::from_millis(100));
        assert_eq!(cfg.delay_for(1), Duration::from_millis(200));
        assert_eq!(cfg.delay_for(2), Duration::from_millis(300));
    }

    #[test]
    fn jitter_stays_within_half_the_delay() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(true);
        for _ in 0..50 {
            let delay = cfg.delay_for(0);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }
}
