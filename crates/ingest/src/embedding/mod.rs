pub mod batcher;
pub mod cache;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod traits;

pub use batcher::BatchedEmbedder;
pub use cache::{CachedEmbedder, EmbeddingCache};
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use provider::from_config;
pub use traits::{Embedder, EmbeddingError};
