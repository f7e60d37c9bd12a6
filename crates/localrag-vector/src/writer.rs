use anyhow::Result;
use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{ArrowError, Schema};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use localrag_core::config::{Settings, MIN_ANN_INDEX_ROWS};
use localrag_core::error::Error;
use localrag_core::traits::EmbeddingProvider;
use localrag_core::types::Chunk;

use crate::index_build::{build_ivfpq_index, compute_ivfpq_params};
use crate::manifest::IndexManifest;
use crate::schema::{build_chunk_schema, CHUNKS_TABLE};
use crate::search::IndexHandle;
use crate::table::open_db;

/// Builds a collection from scratch. A rebuild replaces the whole directory.
pub struct IndexWriter {
    dir: PathBuf,
    batch_size: usize,
    /// Row count at which an IVF_PQ index is trained; 0 disables it.
    ann_index_min_rows: usize,
}

impl IndexWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), batch_size: 64, ann_index_min_rows: 100_000 }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.active_index_dir())
            .with_batch_size(settings.embed_batch_size)
            .with_ann_index_min_rows(settings.ann_index_min_rows)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_ann_index_min_rows(mut self, rows: usize) -> Self {
        self.ann_index_min_rows = rows;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Embed `chunks` and write them as a fresh collection.
    ///
    /// The collection is assembled in a sibling staging directory and only
    /// moved into place once rows, manifest and ANN index are all written, so
    /// a failed build leaves the previous collection intact.
    pub async fn build(&self, chunks: &[Chunk], embedder: &dyn EmbeddingProvider) -> Result<IndexHandle> {
        if chunks.is_empty() {
            return Err(Error::EmptyIndex.into());
        }
        if self.ann_index_min_rows > 0 && self.ann_index_min_rows < MIN_ANN_INDEX_ROWS {
            return Err(Error::InvalidConfig(format!(
                "ann_index_min_rows must be 0 or at least {MIN_ANN_INDEX_ROWS}, got {}",
                self.ann_index_min_rows
            ))
            .into());
        }
        let vectors = self.embed_all(chunks, embedder).await?;
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);

        let staging = self.sibling("staging");
        if staging.exists() {
            tokio::fs::remove_dir_all(&staging).await?;
        }
        tokio::fs::create_dir_all(&staging).await?;
        let manifest = match self.write_collection(&staging, chunks, &vectors, dim, embedder.embedder_id()).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(dir = %staging.display(), error = %e, "build failed; discarding staged collection");
                if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                    warn!(dir = %staging.display(), error = %cleanup, "could not remove staged collection");
                }
                return Err(e);
            }
        };

        self.swap_in(&staging).await?;
        info!(
            dir = %self.dir.display(),
            chunks = chunks.len(),
            dim,
            embedder = %manifest.embedder_id,
            "collection written"
        );
        IndexHandle::open(&self.dir, embedder.embedder_id()).await
    }

    /// `<dir>.<suffix>` next to the collection directory.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        self.dir.with_file_name(format!("{name}.{suffix}"))
    }

    async fn write_collection(
        &self,
        dir: &Path,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        dim: usize,
        embedder_id: &str,
    ) -> Result<IndexManifest> {
        let conn = open_db(dir).await?;
        let schema = build_chunk_schema(dim as i32);
        let mut batches: Vec<std::result::Result<RecordBatch, ArrowError>> = Vec::new();
        for (n, (rows, vecs)) in chunks.chunks(self.batch_size).zip(vectors.chunks(self.batch_size)).enumerate() {
            batches.push(Ok(chunks_to_record_batch(&schema, rows, vecs, n * self.batch_size, dim)?));
        }
        let reader = RecordBatchIterator::new(batches.into_iter(), schema.clone());
        let table = conn.create_table(CHUNKS_TABLE, Box::new(reader)).execute().await?;

        let manifest = IndexManifest {
            embedder_id: embedder_id.to_string(),
            dim,
            chunk_count: chunks.len(),
            built_at: Utc::now().to_rfc3339(),
        };
        manifest.store(&conn).await?;

        if self.ann_index_min_rows > 0 && chunks.len() >= self.ann_index_min_rows {
            let params = compute_ivfpq_params(chunks.len(), dim);
            info!(rows = chunks.len(), nlist = params.nlist, m = params.m, "training IVF_PQ index");
            build_ivfpq_index(&table, "vector_ivfpq", &params).await?;
        }
        Ok(manifest)
    }

    /// Move the staged collection over `self.dir`, keeping the old one aside
    /// until the rename has landed.
    async fn swap_in(&self, staging: &Path) -> Result<()> {
        if let Some(parent) = self.dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let previous = self.sibling("previous");
        if previous.exists() {
            tokio::fs::remove_dir_all(&previous).await?;
        }
        let replacing = self.dir.exists();
        if replacing {
            warn!(dir = %self.dir.display(), "replacing existing collection");
            tokio::fs::rename(&self.dir, &previous).await?;
        }
        if let Err(e) = tokio::fs::rename(staging, &self.dir).await {
            if replacing {
                tokio::fs::rename(&previous, &self.dir).await?;
            }
            return Err(e.into());
        }
        if replacing {
            tokio::fs::remove_dir_all(&previous).await?;
        }
        Ok(())
    }

    async fn embed_all(&self, chunks: &[Chunk], embedder: &dyn EmbeddingProvider) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(embedder.embedder_id().to_string());

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let mut embedded = embedder.embed(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(Error::Backend(format!(
                    "{} returned {} vectors for {} chunks",
                    embedder.embedder_id(),
                    embedded.len(),
                    texts.len()
                ))
                .into());
            }
            vectors.append(&mut embedded);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
        if dim == 0 {
            return Err(Error::Backend(format!("{} returned empty vectors", embedder.embedder_id())).into());
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, found: bad.len() }.into());
        }
        Ok(vectors)
    }
}

fn chunks_to_record_batch(
    schema: &Arc<Schema>,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    first_ordinal: usize,
    dim: usize,
) -> std::result::Result<RecordBatch, ArrowError> {
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    let offsets: Vec<i64> = chunks.iter().map(|c| c.offset as i64).collect();
    let chunk_indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index as i32).collect();
    let ordinals: Vec<i64> = (0..chunks.len()).map(|i| (first_ordinal + i) as i64).collect();
    let contents: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectors = vectors.iter().map(|v| Some(v.iter().copied().map(Some)));
    RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(sources)),
            Arc::new(Int64Array::from(offsets)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(Int64Array::from(ordinals)),
            Arc::new(StringArray::from(contents)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors, dim as i32,
            )),
        ],
    )
}
