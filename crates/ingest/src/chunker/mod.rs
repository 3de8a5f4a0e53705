//! Semantic chunking engine.
//!
//! Splits source texts into retrieval-sized chunks. Text is segmented into
//! sentence and line units, code fences and lists are kept whole, cut points
//! are preferred where the embedding similarity of neighbouring units drops,
//! and every chunk after the first repeats a little of the previous one.
//! When no similarity signal is available the whole call falls back to
//! fixed-window chunking.

mod assembler;
mod boundary;
mod density;
mod fallback;
mod overlap;
mod segment;
mod structure;
mod types;

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use passage_core::{Chunk, ChunkingConfig, ConfigError, Metadata, TextInput};

use crate::embedding::Embedder;

pub use assembler::LOOKAHEAD_UNITS;
pub use density::{density, DENSE_THRESHOLD, SATURATED_DENSITY};
pub use types::{BlockKind, Boundaries, ChunkingPath, FallbackReason, StructuralBlock, TextUnit};

/// Default bound on the embedding request.
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of texts chunked at once by [`SemanticChunker::chunk_multiple_texts`].
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// ── Chunker ─────────────────────────────────────────────────────────────────

/// A validated chunking configuration plus an optional embedding provider.
///
/// Holds no per-call state; one instance can serve any number of calls.
#[derive(Clone)]
pub struct SemanticChunker {
    config: ChunkingConfig,
    embedder: Option<Arc<dyn Embedder>>,
    timeout: Duration,
    max_concurrency: usize,
}

impl std::fmt::Debug for SemanticChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticChunker")
            .field("config", &self.config)
            .field("embedder", &self.embedder.is_some())
            .field("timeout", &self.timeout)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl SemanticChunker {
    /// Fails fast on a config that breaks `min <= target <= max` or has a
    /// threshold outside `[0, 1]`.
    pub fn new(config: ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            embedder: None,
            timeout: DEFAULT_EMBED_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        })
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Longest unit (gap before it included) the segmenter may emit. Half the
    /// size window: a buffer under `min` can always take one more unit without
    /// crossing `max`, and units stay fine enough to re-cut a short tail.
    fn split_limit(&self) -> usize {
        let c = &self.config;
        let window = c.max_chunk_size - c.min_chunk_size;
        c.target_chunk_size.min(window / 2).max(1)
    }

    /// Decide how a call is chunked from the outcome of boundary detection.
    pub async fn select_path(&self, units: &[TextUnit<'_>]) -> ChunkingPath {
        let Some(embedder) = &self.embedder else {
            return ChunkingPath::Fallback(FallbackReason::NoProvider);
        };
        match boundary::detect_boundaries(
            units,
            embedder.as_ref(),
            self.config.similarity_threshold,
            self.timeout,
        )
        .await
        {
            Ok(boundaries) => ChunkingPath::Semantic(boundaries),
            Err(e) => ChunkingPath::Fallback(FallbackReason::ProviderFailed(e)),
        }
    }

    /// Chunk one text. `chunk_index` starts at 0; every chunk carries a copy
    /// of `metadata` with `chunkIndex` set.
    pub async fn chunk_text(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        let mut units = segment::segment(text, self.split_limit());
        if units.is_empty() {
            return Vec::new();
        }

        let blocks = if self.config.enable_content_aware_chunking {
            let blocks = structure::detect_blocks(&units);
            structure::mark_structural(&mut units, &blocks);
            blocks
        } else {
            Vec::new()
        };

        let path = self.select_path(&units).await;
        let pieces = match &path {
            ChunkingPath::Semantic(boundaries) => {
                let ranges = assembler::assemble(&units, &blocks, boundaries, &self.config);
                overlap::apply_overlap(text, &units, &ranges, self.config.overlap)
            }
            ChunkingPath::Fallback(reason) => {
                match reason {
                    FallbackReason::NoProvider => {
                        tracing::debug!("no embedding provider, using fixed-window chunking")
                    }
                    FallbackReason::ProviderFailed(e) => tracing::warn!(
                        error = %e,
                        "embedding provider failed, using fixed-window chunking"
                    ),
                }
                let keep_whole: Vec<Range<usize>> = blocks
                    .iter()
                    .map(|b| units[b.start_unit].char_start..units[b.end_unit].char_end)
                    .collect();
                fallback::fixed_windows(text, &self.config, &keep_whole)
            }
        };

        tracing::debug!(
            units = units.len(),
            blocks = blocks.len(),
            semantic = path.is_semantic(),
            chunks = pieces.len(),
            "chunked text"
        );

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Chunk::new(piece, metadata, i))
            .collect()
    }

    /// Chunk several texts, concatenated in input order with `chunk_index`
    /// continuing across text boundaries. Texts are chunked concurrently.
    pub async fn chunk_multiple_texts(&self, items: &[TextInput]) -> Vec<Chunk> {
        let per_text: Vec<Vec<Chunk>> = stream::iter(items)
            .map(|item| self.chunk_text(&item.text, &item.metadata))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut chunks: Vec<Chunk> = per_text.into_iter().flatten().collect();
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.reindex(i);
        }
        tracing::debug!(texts = items.len(), chunks = chunks.len(), "chunked texts");
        chunks
    }
}

// ── One-shot entry points ───────────────────────────────────────────────────

/// Chunk one text with `config` (defaults when `None`) and an optional
/// provider. Without a provider the call uses fixed-window chunking.
pub async fn chunk_text(
    text: &str,
    metadata: &Metadata,
    config: Option<&ChunkingConfig>,
    embedder: Option<Arc<dyn Embedder>>,
) -> Result<Vec<Chunk>, ConfigError> {
    let chunker = build(config, embedder)?;
    Ok(chunker.chunk_text(text, metadata).await)
}

/// Chunk several texts; see [`SemanticChunker::chunk_multiple_texts`].
pub async fn chunk_multiple_texts(
    items: &[TextInput],
    config: Option<&ChunkingConfig>,
    embedder: Option<Arc<dyn Embedder>>,
) -> Result<Vec<Chunk>, ConfigError> {
    let chunker = build(config, embedder)?;
    Ok(chunker.chunk_multiple_texts(items).await)
}

fn build(
    config: Option<&ChunkingConfig>,
    embedder: Option<Arc<dyn Embedder>>,
) -> Result<SemanticChunker, ConfigError> {
    let chunker = SemanticChunker::new(config.cloned().unwrap_or_default())?;
    Ok(match embedder {
        Some(e) => chunker.with_embedder(e),
        None => chunker,
    })
}
