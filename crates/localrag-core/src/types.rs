//! Domain types shared by the loader, chunker, index store and answer service.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// File formats the loader recognizes. CSV and markdown are read as plain text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    Pdf,
    Text,
    Markdown,
    Csv,
}

impl DocFormat {
    /// Handler order used by the loader.
    pub const ALL: [DocFormat; 4] = [DocFormat::Pdf, DocFormat::Text, DocFormat::Markdown, DocFormat::Csv];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocFormat::Pdf => &["pdf"],
            DocFormat::Text => &["txt"],
            DocFormat::Markdown => &["md", "markdown"],
            DocFormat::Csv => &["csv"],
        }
    }

    pub fn matches_extension(self, ext: &str) -> bool {
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A normalized source document produced by the loader.
///
/// - `source`: path relative to the data directory, `/`-separated
/// - `format`: the handler that produced the text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub format: DocFormat,
}

/// A bounded slice of a document that is embedded and indexed on its own.
///
/// - `id`: `"{source}#{chunk_index}"`
/// - `offset`: byte offset of `text` inside the parent document text
/// - `chunk_index`: position among the chunks of the same document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub offset: usize,
    pub chunk_index: usize,
}

/// A retrieved chunk. `score` is engine-specific but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatQuery {
    pub query: String,
    #[serde(default)]
    pub k: Option<i64>,
}

impl ChatQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), k: None }
    }

    pub fn with_k(mut self, k: i64) -> Self {
        self.k = Some(k);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}
