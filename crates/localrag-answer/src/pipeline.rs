use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use localrag_core::chunker::{Chunker, ChunkerConfig};
use localrag_core::config::Settings;
use localrag_core::loader::DocumentLoader;
use localrag_core::traits::EmbeddingProvider;
use localrag_embed::embedder_from_settings;
use localrag_llm::llm_from_settings;
use localrag_vector::{IndexHandle, IndexWriter};

use crate::service::RagService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    /// `None` when there was nothing to index.
    pub index_dir: Option<PathBuf>,
}

/// Load, chunk, embed and write the collection for the active backend.
pub async fn build_from_settings(settings: &Settings, embedder: &dyn EmbeddingProvider) -> Result<BuildReport> {
    let data_dir = settings.data_path();
    let documents = DocumentLoader::new().load(&data_dir)?;
    if documents.is_empty() {
        info!(dir = %data_dir.display(), "no documents found; nothing to index");
        return Ok(BuildReport { documents: 0, chunks: 0, index_dir: None });
    }

    let chunks = Chunker::new(ChunkerConfig::from_settings(settings))?.chunk(&documents);
    info!(documents = documents.len(), chunks = chunks.len(), "chunked documents");
    if chunks.is_empty() {
        return Ok(BuildReport { documents: documents.len(), chunks: 0, index_dir: None });
    }

    let writer = IndexWriter::from_settings(settings);
    writer.build(&chunks, embedder).await?;
    Ok(BuildReport { documents: documents.len(), chunks: chunks.len(), index_dir: Some(writer.dir().to_path_buf()) })
}

/// Wire the configured backends to the collection built for them.
pub async fn service_from_settings(settings: &Settings) -> Result<RagService> {
    let embedder = embedder_from_settings(settings)?;
    let llm = llm_from_settings(settings)?;
    let index = IndexHandle::open(&settings.active_index_dir(), embedder.embedder_id()).await?;
    Ok(RagService::new(embedder, llm, Arc::new(index), settings.k_neighbors, settings.request_timeout()))
}
