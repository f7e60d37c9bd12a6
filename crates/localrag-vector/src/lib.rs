//! LanceDB-backed chunk collections.
//!
//! One collection per embedding backend lives under `index_dir/<slug>`: a
//! `chunks` table with the vectors and a `meta` table with the manifest.

pub mod index_build;
pub mod manifest;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use manifest::IndexManifest;
pub use search::IndexHandle;
pub use writer::IndexWriter;
