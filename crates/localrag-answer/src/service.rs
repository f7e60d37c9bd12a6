use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use localrag_core::error::Error;
use localrag_core::traits::{EmbeddingProvider, LlmProvider, VectorIndex};
use localrag_core::types::{ChatAnswer, ChatQuery, Health, ScoredChunk};

use crate::prompt::{build_prompt, distinct_sources};

/// The only error callers of [`RagService::chat`] ever see.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Internal error")]
    Internal,
}

/// A retriever configured for one `k`.
struct RetrieverBinding {
    k: usize,
    index: Arc<dyn VectorIndex>,
}

impl RetrieverBinding {
    async fn retrieve(&self, query_vector: &[f32]) -> Result<Vec<ScoredChunk>> {
        self.index.query(query_vector, self.k).await
    }
}

pub struct RagService {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    default_k: usize,
    request_timeout: Duration,
    // swapped whole; requests keep the Arc they read
    binding: RwLock<Arc<RetrieverBinding>>,
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
        default_k: usize,
        request_timeout: Duration,
    ) -> Self {
        let default_k = default_k.max(1);
        let binding = RwLock::new(Arc::new(RetrieverBinding { k: default_k, index: index.clone() }));
        Self { embedder, llm, index, default_k, request_timeout, binding }
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// A requested `k` that is absent or not positive falls back to the default.
    pub fn effective_k(&self, requested: Option<i64>) -> usize {
        match requested {
            Some(k) if k > 0 => usize::try_from(k).unwrap_or(self.default_k),
            _ => self.default_k,
        }
    }

    async fn binding_for(&self, k: usize) -> Arc<RetrieverBinding> {
        {
            let current = self.binding.read().await;
            if current.k == k {
                return current.clone();
            }
        }
        let fresh = Arc::new(RetrieverBinding { k, index: self.index.clone() });
        *self.binding.write().await = fresh.clone();
        debug!(k, "retriever rebound");
        fresh
    }

    /// Retrieve, prompt and generate; bounded by the request timeout.
    pub async fn answer(&self, query: &ChatQuery) -> Result<ChatAnswer> {
        match tokio::time::timeout(self.request_timeout, self.answer_inner(query)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!("answer took longer than {:?}", self.request_timeout)).into()),
        }
    }

    async fn answer_inner(&self, query: &ChatQuery) -> Result<ChatAnswer> {
        let k = self.effective_k(query.k);
        let binding = self.binding_for(k).await;
        let query_vector = self.embedder.embed_query(&query.query).await?;
        let hits = binding.retrieve(&query_vector).await?;
        let prompt = build_prompt(&query.query, &hits);
        let raw = self.llm.complete(&prompt).await?;
        let sources = distinct_sources(&hits);
        info!(k = binding.k, hits = hits.len(), sources = sources.len(), llm = self.llm.name(), "answered");
        Ok(ChatAnswer { answer: raw.trim().to_string(), sources })
    }

    /// Request boundary: failures are logged and reported as [`ChatError::Internal`].
    pub async fn chat(&self, query: &ChatQuery) -> std::result::Result<ChatAnswer, ChatError> {
        self.answer(query).await.map_err(|e| {
            error!(error = ?e, "chat request failed");
            ChatError::Internal
        })
    }

    pub fn health(&self) -> Health {
        Health::ok()
    }
}
