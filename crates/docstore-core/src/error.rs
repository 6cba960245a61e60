use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Dimension mismatch on collection '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch { collection: String, expected: usize, actual: usize },

    #[error("{engine} unavailable: {source}")]
    EngineUnavailable {
        engine: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{engine} failed: {source}")]
    Engine {
        engine: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Could not extract '{path}': {reason}")]
    Extraction { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Transport-level failure talking to `engine`; the cause is kept as the source.
    pub fn unavailable(engine: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::EngineUnavailable { engine, source: source.into() }
    }

    /// Any other failure raised by `engine`; the cause is kept as the source.
    pub fn engine(engine: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Engine { engine, source: source.into() }
    }

    pub fn extraction(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Extraction { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
