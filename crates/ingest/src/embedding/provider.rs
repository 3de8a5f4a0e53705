//! Builds the configured provider stack: cache → batcher → backend.

use std::sync::Arc;

use passage_core::Config;

use super::batcher::BatchedEmbedder;
use super::cache::CachedEmbedder;
use super::ollama::OllamaEmbedder;
use super::openai::OpenAiEmbedder;
use super::traits::{Embedder, EmbeddingError};

/// Provider for `config.embedding.provider`, or `None` for `"none"`.
///
/// Backends are wrapped in a [`BatchedEmbedder`] and, unless the cache
/// capacity is 0, a [`CachedEmbedder`] in front of it.
pub fn from_config(config: &Config) -> Result<Option<Arc<dyn Embedder>>, EmbeddingError> {
    let emb = &config.embedding;
    let dims = emb.dimensions as usize;
    let batch_size = emb.batch_size as usize;

    let backend: Arc<dyn Embedder> = match emb.provider.to_ascii_lowercase().as_str() {
        "" | "none" => return Ok(None),
        "ollama" => Arc::new(BatchedEmbedder::new(
            OllamaEmbedder::new(&config.ollama.url, &config.ollama.embedding_model, dims),
            batch_size,
        )),
        "openai" => {
            let Some(key) = config.openai.api_key.clone() else {
                return Err(EmbeddingError::NotConfigured(
                    "openai provider needs OPENAI_API_KEY".into(),
                ));
            };
            Arc::new(BatchedEmbedder::new(
                OpenAiEmbedder::new(
                    key,
                    &config.openai.model,
                    Some(config.openai.base_url.clone()),
                    dims,
                ),
                batch_size,
            ))
        }
        other => {
            return Err(EmbeddingError::NotConfigured(format!(
                "unknown provider {other:?} (expected none, ollama or openai)"
            )))
        }
    };

    tracing::info!(
        provider = %emb.provider,
        dimensions = dims,
        batch_size,
        cache_capacity = emb.cache_capacity,
        "embedding provider ready"
    );

    if emb.cache_capacity == 0 {
        return Ok(Some(backend));
    }
    let cached: Arc<dyn Embedder> =
        Arc::new(CachedEmbedder::new(backend, emb.cache_capacity as usize));
    Ok(Some(cached))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> Config {
        let mut c = Config::for_profile("PROVIDERTEST_UNSET");
        c.embedding.provider = provider.into();
        c.openai.api_key = None;
        c
    }

    #[test]
    fn none_means_no_provider() {
        assert!(from_config(&config("none")).unwrap().is_none());
        assert!(from_config(&config("")).unwrap().is_none());
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut c = config("ollama");
        c.embedding.dimensions = 384;
        let e = from_config(&c).unwrap().unwrap();
        assert_eq!(e.dimensions(), 384);
    }

    #[test]
    fn openai_without_key_is_rejected() {
        assert!(matches!(
            from_config(&config("openai")),
            Err(EmbeddingError::NotConfigured(_))
        ));

        let mut c = config("OpenAI");
        c.openai.api_key = Some("sk-test".into());
        c.embedding.cache_capacity = 0;
        assert!(from_config(&c).unwrap().is_some());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(from_config(&config("word2vec")).is_err());
    }
}
