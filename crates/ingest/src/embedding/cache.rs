use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;

use super::traits::{Embedder, EmbeddingError};

/// LRU cache mapping text to embedding vector.
pub struct EmbeddingCache {
    cache: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a cached embedding by text.
    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        if let Some(vec) = self.cache.get(text) {
            self.hits += 1;
            Some(vec.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    /// Store an embedding for a text.
    pub fn put(&mut self, text: &str, embedding: Vec<f32>) {
        self.cache.put(text.to_owned(), embedding);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

// ── Caching provider ────────────────────────────────────────────────────────

/// Provider wrapper that only forwards texts it has not embedded recently.
///
/// Repeated texts inside one request are sent once. The lock is never held
/// across the inner request.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Mutex<EmbeddingCache>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(EmbeddingCache::new(capacity)),
        }
    }

    /// (hits, misses) so far.
    pub fn stats(&self) -> (u64, u64) {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        (cache.hits(), cache.misses())
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut pending: Vec<&str> = Vec::new();
        let mut pending_slot: HashMap<&str, usize> = HashMap::new();
        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            for &text in texts {
                let hit = cache.get(text);
                if hit.is_none() && !pending_slot.contains_key(text) {
                    pending_slot.insert(text, pending.len());
                    pending.push(text);
                }
                out.push(hit);
            }
        }

        if pending.is_empty() {
            return Ok(out.into_iter().flatten().collect());
        }

        let fresh = self.inner.embed_batch(&pending).await?;
        if fresh.len() != pending.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: pending.len(),
                actual: fresh.len(),
            });
        }

        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            for (text, vector) in pending.iter().zip(&fresh) {
                cache.put(text, vector.clone());
            }
        }

        Ok(texts
            .iter()
            .zip(out)
            .map(|(text, hit)| hit.unwrap_or_else(|| fresh[pending_slot[text]].clone()))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
