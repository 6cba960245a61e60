use async_trait::async_trait;

use crate::error::Result;
use crate::filter::FilterClause;
use crate::types::{CollectionInfo, DistanceMetric, Document, Meta, RetrievalResult};

/// Produces fixed-dimension vectors for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:nomic-embed-text`).
    fn provider_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Contract of the external vector-store engine. One call is one atomic engine
/// operation; the engine owns id uniqueness within a collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_or_create_collection(&self, name: &str, dimension: usize, metric: DistanceMetric) -> Result<CollectionInfo>;

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Upsert: an existing id is overwritten.
    async fn add(&self, collection: &str, ids: &[String], vectors: &[Vec<f32>], documents: &[String], metadatas: &[Meta]) -> Result<()>;

    /// Nearest neighbors ordered by ascending distance.
    async fn query(&self, collection: &str, embedding: &[f32], k: usize, filter: Option<&FilterClause>) -> Result<Vec<RetrievalResult>>;

    /// Absent ids are ignored.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    async fn get(&self, collection: &str) -> Result<Vec<Document>>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
