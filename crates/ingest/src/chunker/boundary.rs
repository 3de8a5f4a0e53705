//! Similarity boundary detection: one embedding per unit, cosine similarity
//! between neighbours, candidates where it drops below the threshold.

use std::time::Duration;

use super::types::{Boundaries, TextUnit};
use crate::embedding::{Embedder, EmbeddingError};

/// Cosine similarity of two vectors; 0.0 when either has zero norm.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len().min(b.len());
    if dim == 0 {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for i in 0..dim {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// Embed every unit in a single request and mark low-similarity gaps.
///
/// All or nothing: a provider error, an expired `timeout`, or a response that
/// does not hold one correctly sized vector per unit yields `Err`, and no
/// partial boundaries are kept.
pub async fn detect_boundaries(
    units: &[TextUnit<'_>],
    embedder: &dyn Embedder,
    threshold: f32,
    timeout: Duration,
) -> Result<Boundaries, EmbeddingError> {
    if units.len() < 2 {
        return Ok(Boundaries::none(units.len()));
    }

    let texts: Vec<&str> = units.iter().map(|u| u.text).collect();
    let vectors = match tokio::time::timeout(timeout, embedder.embed_batch(&texts)).await {
        Ok(Ok(vectors)) => vectors,
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(EmbeddingError::Timeout(timeout)),
    };

    if vectors.len() != units.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: units.len(),
            actual: vectors.len(),
        });
    }
    let dims = embedder.dimensions();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dims,
            actual: bad.len(),
        });
    }

    let similarities: Vec<f32> = vectors
        .windows(2)
        .map(|pair| cosine_similarity(&pair[0], &pair[1]))
        .collect();
    let boundaries = Boundaries::from_similarities(&similarities, threshold);

    tracing::debug!(
        units = units.len(),
        candidates = boundaries.count(),
        threshold,
        "similarity boundaries detected"
    );
    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::super::segment::segment;
    use super::*;
    use async_trait::async_trait;

    /// Maps each text to a one-hot vector keyed by its first letter, so units
    /// sharing a first letter are identical and others are orthogonal.
    struct FirstLetterEmbedder;

    #[async_trait]
    impl Embedder for FirstLetterEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; 26];
                    let c = t.chars().next().unwrap_or('a').to_ascii_lowercase();
                    v[(c as usize).saturating_sub('a' as usize) % 26] = 1.0;
                    v
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            26
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_and_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn topic_shift_becomes_candidate() {
        let units = segment("Apples are red. Apricots are orange. Bananas are yellow.", 1000);
        let b = detect_boundaries(&units, &FirstLetterEmbedder, 0.7, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(b.positions().collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn single_unit_needs_no_request() {
        let units = segment("Only one sentence.", 1000);
        let b = detect_boundaries(&units, &ShortEmbedder, 0.7, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(b.count(), 0);
    }

    #[tokio::test]
    async fn missing_vectors_are_rejected() {
        let units = segment("One. Two. Three.", 1000);
        let err = detect_boundaries(&units, &ShortEmbedder, 0.7, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::CountMismatch { expected: 3, actual: 2 }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let units = segment("One. Two.", 1000);
        let err = detect_boundaries(&units, &SlowEmbedder, 0.7, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout(_)));
    }
}
