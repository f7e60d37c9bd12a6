//! Embedding providers: Ollama, OpenAI-compatible, and an offline hashing embedder.
//!
//! The backend is chosen once from [`Settings`]; callers only see
//! `Arc<dyn EmbeddingProvider>`. `APP_USE_FAKE_EMBEDDINGS=true` selects the
//! hashing embedder through the usual settings layering.

use std::sync::Arc;

use localrag_core::config::Settings;
use localrag_core::traits::{EmbeddingBackend, EmbeddingProvider};
use tracing::info;

pub mod hashed;
pub mod ollama;
pub mod openai;

pub use hashed::HashEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

pub fn embedder_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding_backend() {
        EmbeddingBackend::Hashed => Arc::new(HashEmbedder::default()),
        EmbeddingBackend::Local => Arc::new(OllamaEmbedder::from_settings(settings)?),
        EmbeddingBackend::Hosted => Arc::new(OpenAiEmbedder::from_settings(settings)?),
    };
    info!(embedder = embedder.embedder_id(), "embedding backend selected");
    Ok(embedder)
}
