//! `Retriever`: follows `CONTINUED_IN` relationships from a seed key over
//! a pluggable [`VeritumRetrievalInterface`] (spec §4.6).

use crate::error::Result;
use crate::source::VeritumRetrievalInterface;
use cube_core::relationship::{Relationship, RelationshipType};
use cube_core::{Cube, CubeKey};
use std::sync::Arc;
use tracing::debug;

pub struct Retriever {
    source: Arc<dyn VeritumRetrievalInterface>,
}

impl Retriever {
    pub fn new(source: Arc<dyn VeritumRetrievalInterface>) -> Self {
        Self { source }
    }

    /// Fetch `seed_key` and every Cube its `CONTINUED_IN` chain points at,
    /// in chain order. Terminates on the first absent successor; the
    /// caller sees a truncated sequence rather than an error (spec §4.6:
    /// "Terminates on absent next chunk (caller sees a truncated
    /// sequence)"). Conceptually a lazy sequence; collected eagerly here
    /// since the store's own range APIs are not streaming either.
    pub async fn get_continuation_chunks(&self, seed_key: CubeKey) -> Result<Vec<Cube>> {
        let mut chunks = Vec::new();
        let mut next = Some(seed_key);
        while let Some(key) = next {
            let Some(cube) = self.source.get_cube(key).await else {
                debug!(?key, "continuation chunk missing; truncating sequence");
                break;
            };
            next = cube
                .fields()?
                .iter()
                .filter_map(Relationship::from_field)
                .find(|rel| rel.rel_type == RelationshipType::ContinuedIn)
                .map(|rel| CubeKey(rel.target));
            chunks.push(cube);
        }
        Ok(chunks)
    }

    /// Fetch and reassemble a full Veritum starting at `seed_key`.
    pub async fn get_veritum(&self, seed_key: CubeKey, opts: veritum::DecodeOptions) -> Result<Option<veritum::Veritum>> {
        let chunks = self.get_continuation_chunks(seed_key).await?;
        if chunks.is_empty() {
            return Ok(None);
        }
        Ok(Some(veritum::from_chunks(chunks, opts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LocalRetriever;
    use cube_core::{CancelToken, CubeKeys, CubeType, Field};
    use cube_store::{CubeStore, StoreConfig};

    fn test_store() -> Arc<CubeStore> {
        CubeStore::open(StoreConfig {
            required_difficulty: 0,
            ..StoreConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn follows_continuation_chain_to_completion() {
        let store = test_store();
        let big_payload = vec![0x42u8; 1800];
        let veritum = veritum::compile(
            vec![Field::payload(big_payload.clone()).unwrap()],
            veritum::CompileOptions::plain(CubeType::Frozen, CubeKeys::default(), 0),
        )
        .await
        .unwrap();
        assert!(veritum.chunks.len() >= 2);
        let seed_key = veritum.chunks[0].get_key().unwrap();
        for chunk in veritum.chunks {
            store.add_cube(chunk).await.unwrap();
        }

        let retriever = Retriever::new(Arc::new(LocalRetriever::new(store)));
        let fetched = retriever.get_veritum(seed_key, veritum::DecodeOptions::default()).await.unwrap().unwrap();
        assert_eq!(fetched.payload(), big_payload);
    }

    #[tokio::test]
    async fn truncates_on_missing_successor() {
        let store = test_store();
        let fields = vec![Field::payload(b"no successor".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Frozen, fields, CubeKeys::default(), 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        let key = cube.get_key().unwrap();
        store.add_cube(cube).await.unwrap();

        let retriever = Retriever::new(Arc::new(LocalRetriever::new(store)));
        let chunks = retriever.get_continuation_chunks(key).await.unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn absent_seed_yields_empty_sequence() {
        let store = test_store();
        let retriever = Retriever::new(Arc::new(LocalRetriever::new(store)));
        let chunks = retriever.get_continuation_chunks(CubeKey([0x11; 32])).await.unwrap();
        assert!(chunks.is_empty());
    }
}
