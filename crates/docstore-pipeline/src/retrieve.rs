use std::sync::Arc;

use tracing::info;

use docstore_core::error::Result;
use docstore_core::filter::FilterClause;
use docstore_core::types::RetrievalResult;
use docstore_vector::CollectionManager;

/// Read-only query path: embed the text, ask the collection for neighbors.
pub struct RetrievalService {
    manager: Arc<CollectionManager>,
}

impl RetrievalService {
    pub fn new(manager: Arc<CollectionManager>) -> Self {
        Self { manager }
    }

    pub async fn retrieve(&self, collection: &str, query_text: &str, k: usize, filter: Option<&FilterClause>) -> Result<Vec<RetrievalResult>> {
        let results = self.manager.query_collection(collection, query_text, k, filter).await?;
        info!(collection, k, hits = results.len(), "retrieval finished");
        Ok(results)
    }
}
