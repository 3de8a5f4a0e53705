//! passage-chunk: split text files into retrieval-sized chunks.
//!
//! Reads each file given on the command line (or stdin when none are given),
//! chunks them in order and prints one JSON object per chunk to stdout.
//! Logs go to stderr.

use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::info;

use passage_core::config::{load_dotenv, Config};
use passage_core::{ChunkingConfig, Metadata, TextInput};
use passage_ingest::embedding;
use passage_ingest::SemanticChunker;

// ── CLI ─────────────────────────────────────────────────────────────

/// Semantic chunker: text files in, JSON lines of chunks out.
#[derive(Parser, Debug)]
#[command(name = "passage-chunk", version, about)]
struct Cli {
    /// Files to chunk. Reads stdin when empty.
    files: Vec<PathBuf>,

    /// TOML file with chunking options (camelCase keys). Replaces the
    /// chunking settings from the environment.
    #[arg(long, env = "CHUNK_CONFIG")]
    config: Option<PathBuf>,

    /// Target chunk size in characters.
    #[arg(long)]
    target: Option<usize>,

    /// Minimum chunk size in characters.
    #[arg(long)]
    min: Option<usize>,

    /// Maximum chunk size in characters.
    #[arg(long)]
    max: Option<usize>,

    /// Characters repeated from the previous chunk.
    #[arg(long)]
    overlap: Option<usize>,

    /// Keep code fences and lists intact.
    #[arg(long)]
    content_aware: bool,

    /// Shrink chunks over dense technical text.
    #[arg(long)]
    adaptive: bool,

    /// Embedding provider: none, ollama or openai.
    #[arg(long)]
    provider: Option<String>,

    /// Files chunked at once.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

impl Cli {
    /// Chunking config from env (or the TOML file), with flags on top.
    fn chunking_config(&self, from_env: &ChunkingConfig) -> anyhow::Result<ChunkingConfig> {
        let mut c = match &self.config {
            Some(path) => ChunkingConfig::from_toml_file(path)
                .with_context(|| format!("reading chunking config {}", path.display()))?,
            None => from_env.clone(),
        };
        if let Some(v) = self.target {
            c.target_chunk_size = v;
        }
        if let Some(v) = self.min {
            c.min_chunk_size = v;
        }
        if let Some(v) = self.max {
            c.max_chunk_size = v;
        }
        if let Some(v) = self.overlap {
            c.overlap = v;
        }
        c.enable_content_aware_chunking |= self.content_aware;
        c.enable_adaptive_sizing |= self.adaptive;
        Ok(c)
    }
}

async fn read_inputs(files: &[PathBuf]) -> anyhow::Result<Vec<TextInput>> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        let metadata: Metadata = [("source", Value::from("stdin"))].into_iter().collect();
        return Ok(vec![TextInput::new(text, metadata)]);
    }

    let mut inputs = Vec::with_capacity(files.len());
    for path in files {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let metadata: Metadata = [("source", Value::from(path.display().to_string()))]
            .into_iter()
            .collect();
        inputs.push(TextInput::new(text, metadata));
    }
    Ok(inputs)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(provider) = &cli.provider {
        config.embedding.provider = provider.clone();
    }
    config.chunking = cli.chunking_config(&config.chunking)?;
    config.log_summary();

    let embedder = embedding::from_config(&config).context("building embedding provider")?;
    let mut chunker = SemanticChunker::new(config.chunking.clone())
        .context("invalid chunking config")?
        .with_timeout(Duration::from_secs(config.embedding.timeout_secs))
        .with_max_concurrency(cli.concurrency);
    if let Some(embedder) = embedder {
        chunker = chunker.with_embedder(embedder);
    }

    let inputs = read_inputs(&cli.files).await?;
    let chunks = chunker.chunk_multiple_texts(&inputs).await;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for chunk in &chunks {
        serde_json::to_writer(&mut out, chunk)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(texts = inputs.len(), chunks = chunks.len(), "chunking complete");
    Ok(())
}
