use std::time::Duration;

use async_trait::async_trait;
use localrag_core::config::Settings;
use localrag_core::error::Error;
use localrag_core::http;
use localrag_core::traits::LlmProvider;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Chat completions from an OpenAI-compatible API. The prompt is sent as a
/// single user message.
pub struct OpenAiLlm {
    client: http::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    name: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiLlm {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        temperature: f32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            Error::InvalidConfig("hosted LLM needs an API key (openai_api_key or OPENAI_API_KEY)".into())
        })?;
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            temperature,
            name: format!("openai:{model}"),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            &settings.openai_base_url,
            &settings.openai_model,
            settings.openai_credential(),
            settings.llm_temperature,
            settings.request_timeout(),
        )
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "openai chat completion");
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let value = http::post_json(&self.client, "openai", &url, &body, Some(&self.api_key)).await?;
        let resp: ChatResponse = serde_json::from_value(value)
            .map_err(|e| Error::Backend(format!("openai chat response: {e}")))?;
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Backend("openai returned no choices".into()))?;
        choice
            .message
            .content
            .ok_or_else(|| Error::Backend("openai returned no message content".into()).into())
    }
}
