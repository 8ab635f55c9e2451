//! In-process embedding cache
//!
//! Provides:
//! - Bounded LRU storage of normalized query -> vector
//! - `get_or_compute` memoization around an `Embedder`
//!
//! The lock is never held while the embedder runs. Two concurrent misses on
//! the same key may both compute; the last write wins, which is harmless
//! because embeddings are deterministic for identical input.

use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::metrics;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEmbedding {
    pub vector: Arc<Vec<f32>>,
    pub hit: bool,
}

/// Bounded LRU cache of query embeddings
pub struct EmbeddingCache {
    entries: Mutex<LruCache<String, Arc<Vec<f32>>>>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` vectors (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a key without computing
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Store a vector under `key`
    pub async fn insert(&self, key: &str, vector: Arc<Vec<f32>>) {
        self.entries.lock().await.put(key.to_string(), vector);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Return the cached vector for `key` or embed it once and remember it
    ///
    /// Empty vectors are returned but not cached, so a transient embedding
    /// failure is retried on the next request.
    pub async fn get_or_compute(
        &self,
        key: &str,
        embedder: &dyn Embedder,
    ) -> Result<CachedEmbedding> {
        if let Some(vector) = self.get(key).await {
            metrics::record_cache(true, "embedding");
            debug!(key, "Embedding cache hit");
            return Ok(CachedEmbedding { vector, hit: true });
        }

        metrics::record_cache(false, "embedding");
        debug!(key, "Embedding cache miss");

        let vector = Arc::new(embedder.embed(key).await?);
        if !vector.is_empty() {
            self.insert(key, Arc::clone(&vector)).await;
        }

        Ok(CachedEmbedding { vector, hit: false })
    }
}
