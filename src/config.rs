//! TOML configuration parsing and validation.
//!
//! All sections except `[db]` are optional and fall back to defaults that
//! run fully offline: embeddings disabled (zero vectors), generation
//! disabled (fixed notice).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub reindex: ReindexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Word-window chunking. `overlap` must be strictly less than `chunk_size`.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    512
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// `combined = vector_weight * vector + lexical_weight * lexical`.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            lexical_weight: default_lexical_weight(),
            default_limit: default_limit(),
        }
    }
}

fn default_vector_weight() -> f64 {
    0.7
}
fn default_lexical_weight() -> f64 {
    0.3
}
fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Disabled,
    OpenAI,
    Ollama,
    Local,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    /// Vector dimensionality D. Required for remote providers; defaults to
    /// 1536 for the zero-vector placeholder when disabled.
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible endpoint or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum simultaneous embedding requests within one document.
    #[serde(default = "default_embed_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Disabled,
            model: None,
            dims: None,
            url: None,
            concurrency: default_embed_concurrency(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout(),
        }
    }
}

pub const PLACEHOLDER_DIMS: usize = 1536;

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != EmbeddingProviderKind::Disabled
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_embed_concurrency() -> usize {
    10
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProviderKind {
    #[default]
    Disabled,
    OpenAI,
    Ollama,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::Disabled,
            model: None,
            url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != GenerationProviderKind::Disabled
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    500
}
fn default_generation_retries() -> u32 {
    2
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReindexConfig {
    /// Documents indexed concurrently by a full reindex.
    #[serde(default = "default_reindex_concurrency")]
    pub concurrency: usize,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            concurrency: default_reindex_concurrency(),
        }
    }
}

fn default_reindex_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Offline defaults with the database at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            reindex: ReindexConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Embedding dimensionality D in effect for this configuration.
    pub fn embedding_dims(&self) -> usize {
        match self.embedding.dims {
            Some(d) => d,
            None if self.embedding.provider == EmbeddingProviderKind::Local => 384,
            None => PLACEHOLDER_DIMS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if chunking.overlap >= chunking.chunk_size {
            bail!(
                "chunking.overlap ({}) must be less than chunking.chunk_size ({})",
                chunking.overlap,
                chunking.chunk_size
            );
        }

        let retrieval = &self.retrieval;
        for (name, w) in [
            ("vector_weight", retrieval.vector_weight),
            ("lexical_weight", retrieval.lexical_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                bail!("retrieval.{} must be in [0.0, 1.0]", name);
            }
        }
        if (retrieval.vector_weight + retrieval.lexical_weight - 1.0).abs() > 1e-6 {
            bail!("retrieval.vector_weight + retrieval.lexical_weight must equal 1.0");
        }
        if !(1..=50).contains(&retrieval.default_limit) {
            bail!("retrieval.default_limit must be between 1 and 50");
        }

        let embedding = &self.embedding;
        if embedding.concurrency == 0 {
            bail!("embedding.concurrency must be > 0");
        }
        if embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
        match embedding.provider {
            EmbeddingProviderKind::OpenAI | EmbeddingProviderKind::Ollama => {
                if embedding.model.is_none() {
                    bail!(
                        "embedding.model must be specified when provider is '{:?}'",
                        embedding.provider
                    );
                }
                if embedding.dims.is_none() {
                    bail!(
                        "embedding.dims must be specified when provider is '{:?}'",
                        embedding.provider
                    );
                }
            }
            EmbeddingProviderKind::Disabled | EmbeddingProviderKind::Local => {}
        }

        if self.generation.is_enabled() && self.generation.model.is_none() {
            bail!(
                "generation.model must be specified when provider is '{:?}'",
                self.generation.provider
            );
        }

        if self.reindex.concurrency == 0 {
            bail!("reindex.concurrency must be > 0");
        }

        Ok(())
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
