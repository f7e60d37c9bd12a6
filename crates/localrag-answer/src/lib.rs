//! Retrieval-augmented answering over a built collection, plus the build
//! pipeline that produces it.

pub mod pipeline;
pub mod prompt;
pub mod service;

pub use pipeline::{build_from_settings, service_from_settings, BuildReport};
pub use service::{ChatError, RagService};
