use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ScoredChunk;

/// Which family of embedding model produced a vector space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Local,
    Hosted,
    Hashed,
}

impl EmbeddingBackend {
    /// Directory name of this backend's collection under `index_dir`.
    pub fn slug(self) -> &'static str {
        match self {
            EmbeddingBackend::Local => "ollama",
            EmbeddingBackend::Hosted => "openai",
            EmbeddingBackend::Hashed => "hashed",
        }
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the backend/model pair (e.g. `ollama:nomic-embed-text`).
    fn embedder_id(&self) -> &str;
    fn backend(&self) -> EmbeddingBackend;
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(crate::error::Error::Backend(format!(
                "{} returned {} vectors for one query",
                self.embedder_id(),
                vectors.len()
            ))
            .into());
        }
        Ok(vectors.remove(0))
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` nearest chunks, most relevant first.
    async fn query(&self, query_vector: &[f32], k: usize) -> anyhow::Result<Vec<ScoredChunk>>;
}
