use std::hash::Hasher;

use async_trait::async_trait;
use localrag_core::traits::{EmbeddingBackend, EmbeddingProvider};
use twox_hash::XxHash64;

pub const DEFAULT_DIM: usize = 384;

/// Offline bag-of-words embedder: each lowercase alphanumeric token adds 1.0
/// to bucket `xxh64(token) % dim`, then the vector is L2-normalized.
/// Texts sharing words land close together, which is enough for tests and
/// demos without a model server.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hashed:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let mut tokens = 0usize;
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            v[self.bucket(&token.to_lowercase())] += 1.0;
            tokens += 1;
        }
        // punctuation-only text still needs a non-zero direction
        if tokens == 0 {
            v[self.bucket(text.trim())] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        (hasher.finish() % self.dim as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Hashed
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
