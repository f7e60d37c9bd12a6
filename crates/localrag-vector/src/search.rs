use anyhow::Result;
use arrow_array::{Array, Float32Array, Int32Array, Int64Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

use localrag_core::error::Error;
use localrag_core::traits::VectorIndex;
use localrag_core::types::{Chunk, ScoredChunk};

use crate::manifest::IndexManifest;
use crate::schema::CHUNKS_TABLE;
use crate::table::{open_db, table_exists};

/// Extra candidates fetched beyond `k` so equal scores at the cut can be
/// ordered by insertion.
const TIE_SLACK: usize = 16;

/// An opened collection, bound to the embedder it was built with.
pub struct IndexHandle {
    table: Table,
    manifest: IndexManifest,
}

impl IndexHandle {
    /// Fails with `NotFound` when no collection exists at `dir` and with
    /// `BackendMismatch` when it was built by a different embedder.
    pub async fn open(dir: &Path, embedder_id: &str) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("no index at {}; run a build first", dir.display())).into());
        }
        let conn = open_db(dir).await?;
        if !table_exists(&conn, CHUNKS_TABLE).await? {
            return Err(Error::NotFound(format!("no '{CHUNKS_TABLE}' table in {}", dir.display())).into());
        }
        let manifest = IndexManifest::load(&conn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("index manifest in {}", dir.display())))?;
        if manifest.embedder_id != embedder_id {
            return Err(
                Error::BackendMismatch { expected: embedder_id.to_string(), found: manifest.embedder_id }.into()
            );
        }
        let table = conn.open_table(CHUNKS_TABLE).execute().await?;
        Ok(Self { table, manifest })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Up to `k` chunks by cosine similarity (`score = 1 - distance`), ties in
    /// insertion order.
    pub async fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".into()).into());
        }
        if query_vector.len() != self.manifest.dim {
            return Err(Error::DimensionMismatch { expected: self.manifest.dim, found: query_vector.len() }.into());
        }
        let fetch = (k * 2).max(k + TIE_SLACK).min(self.manifest.chunk_count.max(1));
        let mut stream = self
            .table
            .vector_search(query_vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .select(Select::columns(&["id", "source", "offset", "chunk_index", "ordinal", "content"]))
            .limit(fetch)
            .execute()
            .await?;

        let mut hits: Vec<(i64, ScoredChunk)> = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            read_hits(&batch, &mut hits)?;
        }
        hits.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        debug!(k, fetched = fetch, returned = hits.len(), "vector query");
        Ok(hits.into_iter().map(|(_, hit)| hit).collect())
    }
}

#[async_trait]
impl VectorIndex for IndexHandle {
    async fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        IndexHandle::query(self, query_vector, k).await
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow::anyhow!("result column '{}' missing or mistyped", name))
}

fn read_hits(batch: &RecordBatch, out: &mut Vec<(i64, ScoredChunk)>) -> Result<()> {
    let ids = column::<StringArray>(batch, "id")?;
    let sources = column::<StringArray>(batch, "source")?;
    let offsets = column::<Int64Array>(batch, "offset")?;
    let chunk_indices = column::<Int32Array>(batch, "chunk_index")?;
    let ordinals = column::<Int64Array>(batch, "ordinal")?;
    let contents = column::<StringArray>(batch, "content")?;
    let distances = column::<Float32Array>(batch, "_distance")?;
    for i in 0..batch.num_rows() {
        let score = if distances.is_valid(i) { 1.0 - distances.value(i) } else { f32::MIN };
        let chunk = Chunk {
            id: ids.value(i).to_string(),
            text: contents.value(i).to_string(),
            source: sources.value(i).to_string(),
            offset: offsets.value(i) as usize,
            chunk_index: chunk_indices.value(i) as usize,
        };
        out.push((ordinals.value(i), ScoredChunk { chunk, score }));
    }
    Ok(())
}
