//! docstore-core
//!
//! Error kinds, domain types, metadata filters, the collaborator traits
//! (`EmbeddingProvider`, `VectorStore`), the `DocumentAssembler` and the
//! configuration loader shared by every docstore crate.

pub mod assembler;
pub mod config;
pub mod error;
pub mod filter;
pub mod traits;
pub mod types;

pub use assembler::{AssembledBatch, DocumentAssembler, ExplicitIdPolicy};
pub use error::{Error, Result};
pub use filter::{FilterClause, FilterCondition, FilterOperator};
pub use traits::{EmbeddingProvider, VectorStore};
pub use types::{CollectionInfo, DistanceMetric, Document, ExtractedDocument, Meta, RetrievalResult, SourceInfo, TextUnit};
