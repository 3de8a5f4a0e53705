use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &[
    "EMBEDDING_PROVIDER",
    "OLLAMA_URL",
    "OPENAI_API_KEY",
    "CHUNK_TARGET_SIZE",
];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PASSAGE_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PASSAGE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            chunking: ChunkingConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            openai: OpenAiConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let c = &self.chunking;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  chunking:    target={}, min={}, max={}, overlap={}, threshold={}",
            c.target_chunk_size, c.min_chunk_size, c.max_chunk_size, c.overlap, c.similarity_threshold
        );
        tracing::info!(
            "  features:    content_aware={}, adaptive_sizing={}",
            c.enable_content_aware_chunking, c.enable_adaptive_sizing
        );
        tracing::info!("  embedding:   provider={}, batch={}", self.embedding.provider, self.embedding.batch_size);
        tracing::info!("  ollama:      url={}", self.ollama.url);
        tracing::info!("  openai:      base_url={}", self.openai.base_url);
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "chunking": self.chunking,
            "embedding": self.embedding,
            "ollama": { "url": self.ollama.url, "model": self.ollama.embedding_model },
            "openai": {
                "base_url": self.openai.base_url,
                "model": self.openai.model,
                "configured": self.openai.is_configured(),
            },
        })
    }
}

// ── Chunking ──────────────────────────────────────────────────

pub const DEFAULT_TARGET_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 500;
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4000;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
pub const DEFAULT_OVERLAP: usize = 200;

/// Options for the chunking engine. All sizes are in characters.
///
/// Fields missing from a serialized config take their defaults, so
/// `{"targetChunkSize": 1000}` is a complete config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingConfig {
    /// Preferred chunk length (default: 2000).
    pub target_chunk_size: usize,
    /// Chunks shorter than this are grown or merged (default: 500).
    pub min_chunk_size: usize,
    /// Hard ceiling, overridden only by oversized structural blocks (default: 4000).
    pub max_chunk_size: usize,
    /// Adjacent units below this cosine similarity are cut candidates (default: 0.7).
    pub similarity_threshold: f32,
    /// Characters of context repeated from the previous chunk (default: 200).
    pub overlap: usize,
    /// Keep code fences and lists intact.
    pub enable_content_aware_chunking: bool,
    /// Shrink the target over dense technical text.
    pub enable_adaptive_sizing: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: DEFAULT_TARGET_CHUNK_SIZE,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            overlap: DEFAULT_OVERLAP,
            enable_content_aware_chunking: false,
            enable_adaptive_sizing: false,
        }
    }
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            target_chunk_size: profiled_env_parse(p, "CHUNK_TARGET_SIZE", d.target_chunk_size),
            min_chunk_size: profiled_env_parse(p, "CHUNK_MIN_SIZE", d.min_chunk_size),
            max_chunk_size: profiled_env_parse(p, "CHUNK_MAX_SIZE", d.max_chunk_size),
            similarity_threshold: profiled_env_parse(
                p,
                "CHUNK_SIMILARITY_THRESHOLD",
                d.similarity_threshold,
            ),
            overlap: profiled_env_parse(p, "CHUNK_OVERLAP", d.overlap),
            enable_content_aware_chunking: profiled_env_bool(p, "CHUNK_CONTENT_AWARE", false),
            enable_adaptive_sizing: profiled_env_bool(p, "CHUNK_ADAPTIVE_SIZING", false),
        }
    }

    /// Parse a (possibly partial) chunking config from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Check the size and threshold contract. Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_chunk_size == 0 {
            return Err(ConfigError::ZeroSize("targetChunkSize"));
        }
        if self.min_chunk_size == 0 {
            return Err(ConfigError::ZeroSize("minChunkSize"));
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(ConfigError::MinExceedsMax {
                min: self.min_chunk_size,
                max: self.max_chunk_size,
            });
        }
        if self.target_chunk_size < self.min_chunk_size
            || self.target_chunk_size > self.max_chunk_size
        {
            return Err(ConfigError::TargetOutOfRange {
                target: self.target_chunk_size,
                min: self.min_chunk_size,
                max: self.max_chunk_size,
            });
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.similarity_threshold));
        }
        Ok(())
    }

    pub fn with_sizes(mut self, target: usize, min: usize, max: usize) -> Self {
        self.target_chunk_size = target;
        self.min_chunk_size = min;
        self.max_chunk_size = max;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_content_aware_chunking(mut self, enabled: bool) -> Self {
        self.enable_content_aware_chunking = enabled;
        self
    }

    pub fn with_adaptive_sizing(mut self, enabled: bool) -> Self {
        self.enable_adaptive_sizing = enabled;
        self
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "none", "ollama", "openai"
    pub provider: String,
    pub dimensions: u32,
    pub batch_size: u32,
    /// LRU capacity for unit vectors; 0 disables the cache.
    pub cache_capacity: u32,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "none"),
            dimensions: profiled_env_parse(p, "EMBEDDING_DIMENSIONS", 768),
            batch_size: profiled_env_parse(p, "EMBEDDING_BATCH_SIZE", 64),
            cache_capacity: profiled_env_parse(p, "EMBEDDING_CACHE_CAPACITY", 10_000),
            timeout_secs: profiled_env_parse(p, "EMBEDDING_TIMEOUT_SECS", 30),
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            embedding_model: profiled_env_or(p, "OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

// ── OpenAI-compatible ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            model: profiled_env_or(p, "OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            base_url: profiled_env_or(p, "OPENAI_BASE_URL", "https://api.openai.com"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
