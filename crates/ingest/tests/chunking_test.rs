//! End-to-end tests through the public chunking API.
//!
//! These drive whole documents through the chunker with a provider stack
//! built from the same decorators the binary uses, and check the output
//! contract: coverage, sizes, intact code fences and the JSON shape.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use passage_ingest::embedding::{BatchedEmbedder, CachedEmbedder, Embedder, EmbeddingError};
use passage_ingest::{chunk_text, ChunkingConfig, Metadata, SemanticChunker, TextInput};

/// Vectors keyed on the first word, so sentences opening the same way are
/// similar. Counts every text it is asked to embed.
struct KeywordEmbedder {
    texts_seen: AtomicUsize,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            texts_seen: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.1; 8];
                let word = t.split_whitespace().next().unwrap_or("");
                let slot = word.bytes().map(usize::from).sum::<usize>() % 8;
                v[slot] = 1.0;
                v
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        8
    }
}

fn document() -> String {
    let mut doc = String::new();
    for i in 0..12 {
        doc.push_str(&format!(
            "Storage engines keep segment {i} on disk until compaction runs. "
        ));
    }
    doc.push_str("\n\n```rust\n");
    for i in 0..10 {
        doc.push_str(&format!("let seg_{i} = store.open({i})?;\n"));
    }
    doc.push_str("```\n\nSteps to follow:\n");
    for i in 1..=6 {
        doc.push_str(&format!("{i}. Flush buffer number {i} before rotating.\n"));
    }
    for i in 0..12 {
        doc.push_str(&format!(
            "Readers open snapshot {i} and never block writers. "
        ));
    }
    doc
}

fn config() -> ChunkingConfig {
    ChunkingConfig::default()
        .with_sizes(400, 200, 800)
        .with_overlap(0)
        .with_content_aware_chunking(true)
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[tokio::test]
async fn document_chunks_cover_input_and_keep_fence_whole() {
    let doc = document();
    let chunker = SemanticChunker::new(config())
        .unwrap()
        .with_embedder(Arc::new(KeywordEmbedder::new()));
    let chunks = chunker.chunk_text(&doc, &Metadata::new()).await;

    assert!(chunks.len() > 2);
    let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(squash(&joined), squash(&doc));

    let fence_start = doc.find("```rust").unwrap();
    let fence_end = doc.rfind("```").unwrap() + 3;
    let fence = &doc[fence_start..fence_end];
    assert_eq!(chunks.iter().filter(|c| c.text.contains(fence)).count(), 1);

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
        assert!(chunk.char_len() <= 800 || chunk.text.contains(fence));
    }
}

#[tokio::test]
async fn provider_stack_embeds_each_unique_unit_once() {
    let backend = Arc::new(KeywordEmbedder::new());
    let stack: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
        BatchedEmbedder::new(backend.clone(), 5),
        1_000,
    ));
    let chunker = SemanticChunker::new(config()).unwrap().with_embedder(stack);

    let doc = document();
    let first = chunker.chunk_text(&doc, &Metadata::new()).await;
    let seen = backend.texts_seen.load(Ordering::SeqCst);
    assert!(seen > 0);
    assert!(backend.calls.load(Ordering::SeqCst) > 1, "requests were not batched");

    let second = chunker.chunk_text(&doc, &Metadata::new()).await;
    assert_eq!(first, second);
    assert_eq!(backend.texts_seen.load(Ordering::SeqCst), seen);
}

#[tokio::test]
async fn toml_config_drives_free_function() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "targetChunkSize = 300\nminChunkSize = 150\nmaxChunkSize = 600\noverlap = 0"
    )
    .unwrap();
    let config = ChunkingConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.similarity_threshold, 0.7);

    let doc = document();
    let chunks = chunk_text(&doc, &Metadata::new(), Some(&config), None)
        .await
        .unwrap();
    assert!(chunks.len() > 2);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 600);
    }
    let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(squash(&joined), squash(&doc));
}

#[tokio::test]
async fn chunks_serialize_with_camel_case_keys() {
    let metadata: Metadata = [("source", Value::from("notes.md")), ("page", Value::from(2))]
        .into_iter()
        .collect();
    let chunker = SemanticChunker::new(ChunkingConfig::default()).unwrap();
    let chunks = chunker
        .chunk_multiple_texts(&[
            TextInput::new("Alpha notes.", metadata.clone()),
            TextInput::new("Beta notes.", metadata),
        ])
        .await;

    let json = serde_json::to_value(&chunks[1]).unwrap();
    assert_eq!(json["text"], "Beta notes.");
    assert_eq!(json["chunkIndex"], 1);
    assert_eq!(json["metadata"]["chunkIndex"], 1);
    assert_eq!(json["metadata"]["source"], "notes.md");
    assert_eq!(json["metadata"]["page"], 2);
}
