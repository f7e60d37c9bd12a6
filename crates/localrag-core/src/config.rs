//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! into [`Settings`]. Paths accept `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::traits::EmbeddingBackend;

/// Fewest rows an IVF_PQ index can be trained on (one PQ codebook of 256 centroids).
pub const MIN_ANN_INDEX_ROWS: usize = 256;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Extract and validate the typed settings. Missing keys take their defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub use_local_llm: bool,
    pub use_local_embeddings: bool,
    /// Offline hashing embedder for development and tests; overrides `use_local_embeddings`.
    pub use_fake_embeddings: bool,

    pub data_dir: String,
    /// Root of the per-backend collections.
    pub index_dir: String,
    pub k_neighbors: usize,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
    pub request_timeout_secs: u64,
    pub ann_index_min_rows: usize,

    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_embed_model: String,

    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_embed_model: String,

    pub llm_temperature: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_local_llm: true,
            use_local_embeddings: true,
            use_fake_embeddings: false,
            data_dir: "data".to_string(),
            index_dir: "index".to_string(),
            k_neighbors: 5,
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 64,
            request_timeout_secs: 120,
            ann_index_min_rows: 100_000,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1:8b".to_string(),
            ollama_embed_model: "nomic-embed-text".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_embed_model: "text-embedding-3-small".to_string(),
            llm_temperature: 0.2,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Config::load()?.settings()
    }

    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        Config::from_figment(Figment::new().merge(Toml::string(toml))).settings()
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_neighbors == 0 {
            return Err(Error::InvalidConfig("k_neighbors must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::InvalidConfig("embed_batch_size must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig("request_timeout_secs must be at least 1".into()));
        }
        if self.ann_index_min_rows > 0 && self.ann_index_min_rows < MIN_ANN_INDEX_ROWS {
            return Err(Error::InvalidConfig(format!(
                "ann_index_min_rows must be 0 (disabled) or at least {MIN_ANN_INDEX_ROWS}, got {}",
                self.ann_index_min_rows
            )));
        }
        Ok(())
    }

    pub fn embedding_backend(&self) -> EmbeddingBackend {
        if self.use_fake_embeddings {
            EmbeddingBackend::Hashed
        } else if self.use_local_embeddings {
            EmbeddingBackend::Local
        } else {
            EmbeddingBackend::Hosted
        }
    }

    pub fn data_path(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// Collection directory for the active embedding backend, so an index built
    /// under one backend is never queried under another.
    pub fn active_index_dir(&self) -> PathBuf {
        expand_path(&self.index_dir).join(self.embedding_backend().slug())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured credential, falling back to `OPENAI_API_KEY`. Empty strings count as missing.
    pub fn openai_credential(&self) -> Option<String> {
        let present = |k: &String| !k.trim().is_empty();
        self.openai_api_key
            .clone()
            .filter(present)
            .or_else(|| env::var("OPENAI_API_KEY").ok().filter(present))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
