use std::time::Duration;

use async_trait::async_trait;
use localrag_core::config::Settings;
use localrag_core::error::Error;
use localrag_core::http;
use localrag_core::traits::{EmbeddingBackend, EmbeddingProvider};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: http::Client,
    base_url: String,
    model: String,
    api_key: String,
    id: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedder {
    /// Fails with `InvalidConfig` when no credential is available.
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            Error::InvalidConfig("hosted embeddings need an API key (openai_api_key or OPENAI_API_KEY)".into())
        })?;
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            id: format!("openai:{model}"),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            &settings.openai_base_url,
            &settings.openai_embed_model,
            settings.openai_credential(),
            settings.request_timeout(),
        )
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Hosted
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        debug!(model = %self.model, batch = texts.len(), "openai embed");
        let body = json!({ "model": self.model, "input": texts });
        let value = http::post_json(&self.client, "openai", &url, &body, Some(&self.api_key)).await?;
        let mut resp: EmbeddingsResponse = serde_json::from_value(value)
            .map_err(|e| Error::Backend(format!("openai embeddings response: {e}")))?;
        if resp.data.len() != texts.len() {
            return Err(Error::Backend(format!(
                "openai returned {} embeddings for {} inputs",
                resp.data.len(),
                texts.len()
            ))
            .into());
        }
        resp.data.sort_by_key(|item| item.index);
        Ok(resp.data.into_iter().map(|item| item.embedding).collect())
    }
}
