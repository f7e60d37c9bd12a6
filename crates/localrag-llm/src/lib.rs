//! Text-generation backends behind [`LlmProvider`].

use std::sync::Arc;

use localrag_core::config::Settings;
use localrag_core::traits::LlmProvider;
use tracing::info;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaLlm;
pub use openai::OpenAiLlm;

/// `use_local_llm` picks Ollama, otherwise the hosted API.
pub fn llm_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = if settings.use_local_llm {
        Arc::new(OllamaLlm::from_settings(settings)?)
    } else {
        Arc::new(OpenAiLlm::from_settings(settings)?)
    };
    info!(llm = llm.name(), "language model selected");
    Ok(llm)
}
