use std::time::Duration;

use async_trait::async_trait;
use localrag_core::config::Settings;
use localrag_core::error::Error;
use localrag_core::http;
use localrag_core::traits::LlmProvider;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Completions from a local Ollama server (`POST /api/generate`, non-streaming).
pub struct OllamaLlm {
    client: http::Client,
    base_url: String,
    model: String,
    temperature: f32,
    name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaLlm {
    pub fn new(base_url: &str, model: &str, temperature: f32, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            name: format!("ollama:{model}"),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            &settings.ollama_base_url,
            &settings.ollama_model,
            settings.llm_temperature,
            settings.request_timeout(),
        )
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "ollama generate");
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let value = http::post_json(&self.client, "ollama", &url, &body, None).await?;
        let resp: GenerateResponse = serde_json::from_value(value)
            .map_err(|e| Error::Backend(format!("ollama generate response: {e}")))?;
        Ok(resp.response)
    }
}
