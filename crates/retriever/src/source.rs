//! `VeritumRetrievalInterface`: the pluggable source a [`crate::Retriever`]
//! pulls Cubes from (spec §4.6). The network-backed implementation is out
//! of scope (spec §1); this module provides the local, store-backed one
//! plus a timeout/retry decorator any future transport-backed source can
//! sit behind without the `Retriever` itself changing.

use async_trait::async_trait;
use cube_core::{Cube, CubeKey};
use cube_store::CubeStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A source of Cubes by key. Implementations may be backed by a local
/// store or a remote peer; the retriever does not care which.
#[async_trait]
pub trait VeritumRetrievalInterface: Send + Sync {
    async fn get_cube(&self, key: CubeKey) -> Option<Cube>;
}

/// Wraps a local [`CubeStore`] as a retrieval source.
pub struct LocalRetriever {
    store: Arc<CubeStore>,
}

impl LocalRetriever {
    pub fn new(store: Arc<CubeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl VeritumRetrievalInterface for LocalRetriever {
    async fn get_cube(&self, key: CubeKey) -> Option<Cube> {
        match self.store.get_cube(&key) {
            Ok(cube) => cube,
            Err(e) => {
                debug!(error = %e, "local retrieval failed");
                None
            }
        }
    }
}

/// Decorates any [`VeritumRetrievalInterface`] with a per-attempt timeout
/// and a bounded retry budget (spec §4.6: "a network-backed implementation
/// with request timeouts and retry budgets").
pub struct WithRetry<S> {
    inner: S,
    timeout: Duration,
    max_attempts: u32,
}

impl<S> WithRetry<S> {
    pub fn new(inner: S, timeout: Duration, max_attempts: u32) -> Self {
        Self {
            inner,
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl<S: VeritumRetrievalInterface> VeritumRetrievalInterface for WithRetry<S> {
    async fn get_cube(&self, key: CubeKey) -> Option<Cube> {
        for attempt in 0..self.max_attempts {
            match tokio::time::timeout(self.timeout, self.inner.get_cube(key)).await {
                Ok(Some(cube)) => return Some(cube),
                Ok(None) => return None,
                Err(_) => {
                    debug!(?key, attempt, "retrieval attempt timed out");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_core::{CubeKeys, CubeType, Field};

    fn test_store() -> Arc<CubeStore> {
        let config = cube_store::StoreConfig {
            required_difficulty: 0,
            ..cube_store::StoreConfig::default()
        };
        CubeStore::open(config).unwrap()
    }

    #[tokio::test]
    async fn local_retriever_fetches_admitted_cube() {
        let store = test_store();
        let fields = vec![Field::payload(b"retrievable".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Frozen, fields, CubeKeys::default(), 0).unwrap();
        cube.compile(cube_core::CancelToken::new()).await.unwrap();
        let key = cube.get_key().unwrap();
        store.add_cube(cube).await.unwrap();

        let retriever = LocalRetriever::new(store);
        let fetched = retriever.get_cube(key).await;
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn local_retriever_reports_missing_as_none() {
        let store = test_store();
        let retriever = LocalRetriever::new(store);
        let missing = cube_core::CubeKey([0x99; 32]);
        assert!(retriever.get_cube(missing).await.is_none());
    }
}
