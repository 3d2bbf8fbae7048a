//! Wraps any [`GraphStore`] backend with a [`CircuitBreaker`], so repeated
//! upstream failures fail fast with `UPSTREAM_UNAVAILABLE` instead of
//! letting every request hang on its own timeout against a backend that is
//! already down. Applied to [`crate::bolt::BoltGraphStore`] in production;
//! the in-memory [`crate::fixture::FixtureGraphStore`] never needs it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphrag_core::model::{ResultRow, Scalar};
use graphrag_core::providers::graph_store::{SchemaIntrospection, TxMode};
use graphrag_core::providers::GraphStore;
use graphrag_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
use graphrag_core::Result;

/// A [`GraphStore`] wrapped with a circuit breaker. Every call is counted
/// towards the breaker's failure threshold via [`graphrag_core::Error::is_recoverable`]
/// — validation-shaped errors a malformed candidate might somehow cause
/// never trip it, only transport-level failures do.
pub struct ResilientGraphStore {
    inner: Arc<dyn GraphStore>,
    breaker: CircuitBreaker,
}

impl ResilientGraphStore {
    #[must_use]
    pub fn new(inner: Arc<dyn GraphStore>, name: impl Into<String>) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(name, CircuitBreakerConfig::default()),
        }
    }

    #[must_use]
    pub fn with_config(
        inner: Arc<dyn GraphStore>,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(name, config),
        }
    }
}

#[async_trait]
impl GraphStore for ResilientGraphStore {
    async fn query(
        &self,
        cypher: &str,
        params: &BTreeMap<String, Scalar>,
        mode: TxMode,
        timeout: Duration,
    ) -> Result<Vec<ResultRow>> {
        self.breaker
            .call(|| self.inner.query(cypher, params, mode, timeout))
            .await
    }

    async fn introspect_schema(&self) -> Result<SchemaIntrospection> {
        self.breaker.call(|| self.inner.introspect_schema()).await
    }

    async fn create_vector_index(&self, name: &str, dimension: usize) -> Result<()> {
        self.breaker
            .call(|| self.inner.create_vector_index(name, dimension))
            .await
    }

    async fn drop_vector_index(&self, name: &str) -> Result<()> {
        self.breaker.call(|| self.inner.drop_vector_index(name)).await
    }

    async fn vector_search(
        &self,
        index: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>> {
        self.breaker
            .call(|| self.inner.vector_search(index, embedding, k))
            .await
    }

    async fn fetch_chunk(&self, chunk_id: &str) -> Result<Option<(String, String)>> {
        self.breaker.call(|| self.inner.fetch_chunk(chunk_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag_core::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn query(
            &self,
            _cypher: &str,
            _params: &BTreeMap<String, Scalar>,
            _mode: TxMode,
            _timeout: Duration,
        ) -> Result<Vec<ResultRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::UpstreamUnavailable("down".to_string()))
        }
        async fn introspect_schema(&self) -> Result<SchemaIntrospection> {
            Ok(SchemaIntrospection::default())
        }
        async fn create_vector_index(&self, _name: &str, _dimension: usize) -> Result<()> {
            Ok(())
        }
        async fn drop_vector_index(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn vector_search(
            &self,
            _index: &str,
            _embedding: &[f32],
            _k: usize,
        ) -> Result<Vec<(String, f32)>> {
            Ok(Vec::new())
        }
        async fn fetch_chunk(&self, _chunk_id: &str) -> Result<Option<(String, String)>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn trips_open_after_repeated_failures_and_stops_calling_the_inner_store() {
        let inner = Arc::new(FlakyStore {
            calls: AtomicUsize::new(0),
        });
        let store = ResilientGraphStore::with_config(
            inner.clone(),
            "test-bolt",
            CircuitBreakerConfig {
                failure_threshold: 2,
                timeout: Duration::from_secs(30),
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
            },
        );

        for _ in 0..2 {
            let _ = store
                .query(
                    "MATCH (n) RETURN n",
                    &BTreeMap::new(),
                    TxMode::ReadOnly,
                    Duration::from_secs(1),
                )
                .await;
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        let err = store
            .query(
                "MATCH (n) RETURN n",
                &BTreeMap::new(),
                TxMode::ReadOnly,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
        // The breaker rejected this call without reaching the inner store.
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
