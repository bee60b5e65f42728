//! Time-bounded cache in front of an [`IndicatorSource`].
//!
//! Entries are keyed by the full [`FetchRequest`] (indicator, units, window).
//! An entry older than the TTL counts as absent and is replaced on the next
//! fetch; failed fetches are never stored.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::provider::{FetchRequest, IndicatorSource};
use crate::types::{Observation, ScmError};

pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<FetchRequest, (Instant, Vec<Observation>)>>,
}

impl<S: IndicatorSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<S: IndicatorSource> IndicatorSource for CachedSource<S> {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Observation>, ScmError> {
        if let Some((stored_at, observations)) = self.entries.read().await.get(request) {
            if stored_at.elapsed() < self.ttl {
                debug!(indicator = %request.indicator_code, "cache hit");
                return Ok(observations.clone());
            }
        }

        let observations = self.inner.fetch(request).await?;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(request.clone(), (Instant::now(), observations.clone()));
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(code: &str) -> FetchRequest {
        FetchRequest {
            indicator_code: code.to_string(),
            units: vec!["AAA".to_string()],
            start_year: 2010,
            end_year: 2012,
        }
    }

    fn source() -> StaticSource {
        StaticSource::new(vec![
            Observation::new("AAA", 2010, 1.0),
            Observation::new("AAA", 2011, 2.0),
        ])
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cached = CachedSource::new(source(), Duration::from_secs(60));
        let a = cached.fetch(&request("X")).await.unwrap();
        let b = cached.fetch(&request("X")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cached.inner.calls(), 1);
        assert_eq!(cached.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys() {
        let cached = CachedSource::new(source(), Duration::from_secs(60));
        cached.fetch(&request("X")).await.unwrap();
        cached.fetch(&request("Y")).await.unwrap();
        assert_eq!(cached.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_refetch_after_expiry() {
        let cached = CachedSource::new(source(), Duration::from_millis(30));
        cached.fetch(&request("X")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        cached.fetch(&request("X")).await.unwrap();
        assert_eq!(cached.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let cached = CachedSource::new(source(), Duration::from_secs(60));
        cached.fetch(&request("X")).await.unwrap();
        cached.clear().await;
        assert!(cached.is_empty().await);
        cached.fetch(&request("X")).await.unwrap();
        assert_eq!(cached.inner.calls(), 2);
    }

    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IndicatorSource for FailingSource {
        async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Observation>, ScmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ScmError::Timeout { secs: 15 })
        }
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let cached = CachedSource::new(
            FailingSource {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(60),
        );
        assert!(cached.fetch(&request("X")).await.is_err());
        assert!(cached.fetch(&request("X")).await.is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty().await);
    }
}
