//! Collection lifecycle on top of a `VectorStore` engine.
//!
//! The manager owns the engine connection and the embedding provider, and
//! enforces the per-collection invariants: the declared dimension never
//! changes, every vector sent to the engine has that dimension, and a batch
//! is submitted in one engine call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use docstore_core::config::{EngineKind, Settings};
use docstore_core::error::{Error, Result};
use docstore_core::filter::FilterClause;
use docstore_core::traits::{EmbeddingProvider, VectorStore};
use docstore_core::types::{CollectionInfo, DistanceMetric, Document, Meta, RetrievalResult};

use crate::lance::LanceStore;
use crate::memory::MemoryStore;

/// A resolved collection: its name plus the dimension and metric it was
/// declared with in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionHandle {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl From<CollectionInfo> for CollectionHandle {
    fn from(info: CollectionInfo) -> Self {
        Self { name: info.name, dimension: info.dimension, metric: info.metric }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddAck {
    pub collection: String,
    /// Distinct ids written; duplicates inside the batch count once.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteAck {
    pub collection: String,
    pub requested: usize,
}

/// Open the engine named by `settings.vector.engine`.
pub async fn open_engine(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector.engine {
        EngineKind::Lance => Ok(Arc::new(LanceStore::connect(&settings.vector_uri()).await?)),
        EngineKind::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

pub struct CollectionManager {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    metric: DistanceMetric,
    create_on_query: bool,
    closed: AtomicBool,
}

impl CollectionManager {
    /// Bind an engine and a provider. The provider must produce vectors of the
    /// configured dimension.
    pub fn connect(settings: &Settings, store: Arc<dyn VectorStore>, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if provider.dim() != settings.vector.dimension {
            return Err(Error::InvalidConfig(format!(
                "vector.dimension is {} but embedding provider '{}' produces {}",
                settings.vector.dimension,
                provider.provider_id(),
                provider.dim()
            )));
        }
        info!(engine = store.name(), provider = provider.provider_id(), dim = provider.dim(), "collection manager connected");
        Ok(Self {
            store,
            provider,
            metric: settings.vector.metric,
            create_on_query: settings.vector.create_on_query,
            closed: AtomicBool::new(false),
        })
    }

    /// Open the configured engine, then `connect`.
    pub async fn open(settings: &Settings, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let store = open_engine(settings).await?;
        Self::connect(settings, store, provider)
    }

    /// Release the engine. Later calls fail with `EngineUnavailable`; closing
    /// twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(engine = self.store.name(), "closing collection manager");
        self.store.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::unavailable(self.store.name(), anyhow::anyhow!("connection closed")));
        }
        Ok(())
    }

    fn check_dimension(&self, handle: &CollectionHandle) -> Result<()> {
        if handle.dimension != self.provider.dim() {
            warn!(collection = %handle.name, declared = handle.dimension, provider = self.provider.dim(), "dimension mismatch");
            return Err(Error::DimensionMismatch {
                collection: handle.name.clone(),
                expected: handle.dimension,
                actual: self.provider.dim(),
            });
        }
        Ok(())
    }

    fn check_vector(&self, handle: &CollectionHandle, vector: &[f32]) -> Result<()> {
        if vector.len() != handle.dimension {
            return Err(Error::DimensionMismatch {
                collection: handle.name.clone(),
                expected: handle.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Get or create `name`. An existing collection keeps its declared
    /// dimension even when it differs from the provider's; the mismatch
    /// surfaces when the handle is used.
    pub async fn ensure(&self, name: &str) -> Result<CollectionHandle> {
        self.check_open()?;
        validate_name(name)?;
        let info = self.store.get_or_create_collection(name, self.provider.dim(), self.metric).await?;
        if info.dimension != self.provider.dim() {
            warn!(collection = name, declared = info.dimension, provider = self.provider.dim(), "existing collection has a different dimension");
        }
        debug!(collection = name, dimension = info.dimension, size = info.size, "collection ready");
        Ok(info.into())
    }

    /// Look up an existing collection without creating it.
    pub async fn collection(&self, name: &str) -> Result<CollectionHandle> {
        self.check_open()?;
        validate_name(name)?;
        match self.store.get_collection(name).await? {
            Some(info) => Ok(info.into()),
            None => Err(Error::CollectionNotFound(name.to_string())),
        }
    }

    /// Embed and upsert one batch. Repeated ids inside the batch keep their
    /// last occurrence.
    pub async fn add(&self, handle: &CollectionHandle, documents: &[String], metadatas: &[Meta], ids: &[String]) -> Result<AddAck> {
        self.check_open()?;
        if documents.is_empty() {
            return Err(Error::Validation("cannot add an empty batch".into()));
        }
        if documents.len() != metadatas.len() || documents.len() != ids.len() {
            return Err(Error::Validation(format!(
                "batch lengths differ: {} documents, {} metadatas, {} ids",
                documents.len(),
                metadatas.len(),
                ids.len()
            )));
        }
        if ids.iter().any(|id| id.is_empty()) {
            return Err(Error::Validation("document ids must not be empty".into()));
        }
        self.check_dimension(handle)?;

        let keep = last_occurrences(ids);
        if keep.len() < ids.len() {
            debug!(collection = %handle.name, dropped = ids.len() - keep.len(), "collapsed repeated ids in batch");
        }
        let ids: Vec<String> = keep.iter().map(|&i| ids[i].clone()).collect();
        let documents: Vec<String> = keep.iter().map(|&i| documents[i].clone()).collect();
        let metadatas: Vec<Meta> = keep.iter().map(|&i| metadatas[i].clone()).collect();

        let vectors = self.provider.embed_documents(&documents).await?;
        if vectors.len() != documents.len() {
            return Err(Error::engine(
                "embedding",
                anyhow::anyhow!("provider returned {} vectors for {} documents", vectors.len(), documents.len()),
            ));
        }
        for vector in &vectors {
            self.check_vector(handle, vector)?;
        }
        self.store.add(&handle.name, &ids, &vectors, &documents, &metadatas).await?;
        info!(collection = %handle.name, count = ids.len(), "added documents");
        Ok(AddAck { collection: handle.name.clone(), count: ids.len() })
    }

    /// Top-`k` neighbors of `query_text`, nearest first.
    pub async fn query(&self, handle: &CollectionHandle, query_text: &str, k: usize, filter: Option<&FilterClause>) -> Result<Vec<RetrievalResult>> {
        self.check_open()?;
        if k == 0 {
            return Err(Error::Validation("k must be at least 1".into()));
        }
        if query_text.trim().is_empty() {
            return Err(Error::Validation("query text must not be empty".into()));
        }
        self.check_dimension(handle)?;
        let embedding = self.provider.embed_query(query_text).await?;
        self.check_vector(handle, &embedding)?;
        let filter = filter.filter(|f| !f.is_empty());
        let results = self.store.query(&handle.name, &embedding, k, filter).await?;
        debug!(collection = %handle.name, k, hits = results.len(), filtered = filter.is_some(), "query done");
        Ok(results)
    }

    /// `query` by collection name. A missing collection is created only when
    /// `vector.create_on_query` is set.
    pub async fn query_collection(&self, name: &str, query_text: &str, k: usize, filter: Option<&FilterClause>) -> Result<Vec<RetrievalResult>> {
        let handle = if self.create_on_query { self.ensure(name).await? } else { self.collection(name).await? };
        self.query(&handle, query_text, k, filter).await
    }

    /// Remove `ids`. Ids that are not stored are ignored.
    pub async fn delete(&self, handle: &CollectionHandle, ids: &[String]) -> Result<DeleteAck> {
        self.check_open()?;
        if !ids.is_empty() {
            self.store.delete(&handle.name, ids).await?;
        }
        info!(collection = %handle.name, requested = ids.len(), "deleted documents");
        Ok(DeleteAck { collection: handle.name.clone(), requested: ids.len() })
    }

    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        self.check_open()?;
        self.store.list_collections().await
    }

    /// Every stored document of the collection, unpaginated.
    pub async fn list_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>> {
        self.check_open()?;
        self.store.get(&handle.name).await
    }
}

/// Open a manager for `settings`, run `f`, and close the manager whether `f`
/// succeeded or not. An error from `f` wins over an error from closing.
pub async fn with_manager<F, Fut, T>(settings: &Settings, provider: Arc<dyn EmbeddingProvider>, f: F) -> Result<T>
where
    F: FnOnce(Arc<CollectionManager>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let manager = Arc::new(CollectionManager::open(settings, provider).await?);
    let outcome = f(Arc::clone(&manager)).await;
    let closed = manager.close().await;
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "close failed after an earlier error");
            }
            Err(e)
        }
    }
}

/// Collection names double as table names: ASCII letters, digits, `_`, `-`
/// and `.` only.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("collection name must not be empty".into()));
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))) {
        return Err(Error::Validation(format!("collection name '{}' contains '{}'", name, c)));
    }
    Ok(())
}

/// Indices of the last occurrence of each id, in ascending order.
fn last_occurrences(ids: &[String]) -> Vec<usize> {
    let mut last: HashMap<&str, usize> = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        last.insert(id.as_str(), i);
    }
    (0..ids.len()).filter(|&i| last.get(ids[i].as_str()) == Some(&i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_ids_keep_the_last_position() {
        let ids: Vec<String> = ["a", "b", "a", "c", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(last_occurrences(&ids), vec![2, 3, 4]);
    }

    #[test]
    fn names_are_restricted_to_table_safe_characters() {
        assert!(validate_name("news_2024-v1.0").is_ok());
        assert!(matches!(validate_name(""), Err(Error::Validation(_))));
        assert!(matches!(validate_name("a/b"), Err(Error::Validation(_))));
    }
}
