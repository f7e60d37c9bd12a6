use std::time::Duration;

use async_trait::async_trait;
use localrag_core::config::Settings;
use localrag_core::error::Error;
use localrag_core::http;
use localrag_core::traits::{EmbeddingBackend, EmbeddingProvider};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Embeddings from a local Ollama server (`POST /api/embed`).
pub struct OllamaEmbedder {
    client: http::Client,
    base_url: String,
    model: String,
    id: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            id: format!("ollama:{model}"),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(&settings.ollama_base_url, &settings.ollama_embed_model, settings.request_timeout())
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Local
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.base_url);
        debug!(model = %self.model, batch = texts.len(), "ollama embed");
        let body = json!({ "model": self.model, "input": texts });
        let value = http::post_json(&self.client, "ollama", &url, &body, None).await?;
        let resp: EmbedResponse = serde_json::from_value(value)
            .map_err(|e| Error::Backend(format!("ollama embed response: {e}")))?;
        if resp.embeddings.len() != texts.len() {
            return Err(Error::Backend(format!(
                "ollama returned {} embeddings for {} inputs",
                resp.embeddings.len(),
                texts.len()
            ))
            .into());
        }
        Ok(resp.embeddings)
    }
}
