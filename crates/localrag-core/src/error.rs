use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backend '{backend}' is unreachable: {detail}")]
    BackendUnavailable { backend: String, detail: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Refusing to build an index from zero chunks")]
    EmptyIndex,

    #[error("Index was built with embedder '{found}' but the active embedder is '{expected}'; rebuild the index")]
    BackendMismatch { expected: String, found: String },

    #[error("Vector dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Backend call failed: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
