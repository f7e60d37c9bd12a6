use anyhow::Result;
use lancedb::Connection;
use serde::{Deserialize, Serialize};

use crate::schema::META_TABLE;
use crate::table::{get_meta, set_meta};

const MANIFEST_KEY: &str = "manifest";

/// What a collection was built with. Stored as JSON under one `meta` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub embedder_id: String,
    pub dim: usize,
    pub chunk_count: usize,
    /// RFC 3339 build time.
    pub built_at: String,
}

impl IndexManifest {
    pub async fn store(&self, conn: &Connection) -> Result<()> {
        set_meta(conn, META_TABLE, MANIFEST_KEY, &serde_json::to_string(self)?).await
    }

    pub async fn load(conn: &Connection) -> Result<Option<Self>> {
        match get_meta(conn, META_TABLE, MANIFEST_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
