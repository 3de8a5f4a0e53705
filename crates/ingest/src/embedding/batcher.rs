use async_trait::async_trait;

use super::traits::{Embedder, EmbeddingError};

/// Splits requests larger than the provider's batch limit into sequential
/// sub-requests. Any failing sub-request fails the whole call.
pub struct BatchedEmbedder<E> {
    inner: E,
    batch_size: usize,
}

impl<E: Embedder> BatchedEmbedder<E> {
    pub fn new(inner: E, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[async_trait]
impl<E: Embedder> Embedder for BatchedEmbedder<E> {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.len() <= self.batch_size {
            return self.inner.embed_batch(texts).await;
        }

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.inner.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            out.extend(vectors);
        }
        tracing::debug!(
            texts = texts.len(),
            batches = texts.len().div_ceil(self.batch_size),
            "embedded in batches"
        );
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
