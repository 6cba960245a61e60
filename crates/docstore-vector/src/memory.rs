//! In-process engine with brute-force search. For tests and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use docstore_core::error::{Error, Result};
use docstore_core::filter::FilterClause;
use docstore_core::traits::VectorStore;
use docstore_core::types::{CollectionInfo, DistanceMetric, Document, Meta, RetrievalResult};

#[derive(Debug, Clone)]
struct Row {
    text: String,
    metadata: Meta,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    metric: DistanceMetric,
    rows: HashMap<String, Row>,
}

impl Collection {
    fn info(&self, name: &str) -> CollectionInfo {
        CollectionInfo { name: name.to_string(), dimension: self.dimension, metric: self.metric, size: self.rows.len() }
    }
}

/// Clones share the same underlying collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_or_create_collection(&self, name: &str, dimension: usize, metric: DistanceMetric) -> Result<CollectionInfo> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(name.to_string()).or_insert_with(|| {
            debug!(collection = name, dimension, "created collection");
            Collection { dimension, metric, rows: HashMap::new() }
        });
        Ok(collection.info(name))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.collections.read().await.get(name).map(|c| c.info(name)))
    }

    async fn add(&self, collection: &str, ids: &[String], vectors: &[Vec<f32>], documents: &[String], metadatas: &[Meta]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != target.dimension) {
            return Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                expected: target.dimension,
                actual: bad.len(),
            });
        }
        for (((id, vector), text), metadata) in ids.iter().zip(vectors).zip(documents).zip(metadatas) {
            target.rows.insert(id.clone(), Row { text: text.clone(), metadata: metadata.clone(), vector: vector.clone() });
        }
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize, filter: Option<&FilterClause>) -> Result<Vec<RetrievalResult>> {
        let collections = self.collections.read().await;
        let target = collections.get(collection).ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;
        let mut hits: Vec<RetrievalResult> = target
            .rows
            .iter()
            .filter(|(_, row)| filter.map_or(true, |f| f.matches(&row.metadata)))
            .map(|(id, row)| RetrievalResult {
                id: id.clone(),
                text: row.text.clone(),
                metadata: row.metadata.clone(),
                distance: target.metric.distance(embedding, &row.vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;
        for id in ids {
            target.rows.remove(id);
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read().await;
        let mut out: Vec<CollectionInfo> = collections.iter().map(|(name, c)| c.info(name)).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let target = collections.get(collection).ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;
        let mut docs: Vec<Document> = target
            .rows
            .iter()
            .map(|(id, row)| Document { id: id.clone(), text: row.text.clone(), metadata: row.metadata.clone() })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }
}
