//! Semantic chunking for the ingestion pipeline.
//!
//! [`chunker`] turns source texts into retrieval-sized [`Chunk`]s;
//! [`embedding`] holds the provider seam it uses for similarity boundaries.

pub mod chunker;
pub mod embedding;

pub use chunker::{chunk_multiple_texts, chunk_text, ChunkingPath, FallbackReason, SemanticChunker};
pub use passage_core::{Chunk, ChunkingConfig, ConfigError, Metadata, TextInput};
