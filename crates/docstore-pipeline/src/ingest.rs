use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use docstore_core::assembler::{DocumentAssembler, ExplicitIdPolicy};
use docstore_core::error::{Error, Result};
use docstore_core::types::ExtractedDocument;
use docstore_extract::FormatReader;
use docstore_vector::CollectionManager;

/// Outcome of one ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    /// Ids as assigned, one per extracted unit, in source order.
    pub ids: Vec<String>,
    /// Distinct documents written.
    pub count: usize,
}

/// Read, assemble, embed and store one file as a single unit of work. Nothing
/// is written unless every step succeeds.
pub struct IngestionService {
    manager: Arc<CollectionManager>,
    reader: FormatReader,
    assembler: DocumentAssembler,
}

impl IngestionService {
    pub fn new(manager: Arc<CollectionManager>, policy: ExplicitIdPolicy) -> Self {
        Self { manager, reader: FormatReader::new(), assembler: DocumentAssembler::new(policy) }
    }

    pub async fn ingest(&self, path: &Path, tag: &str, collection: &str, explicit_id: Option<&str>) -> Result<IngestReport> {
        info!(path = %path.display(), tag, collection, "ingest started");
        let extracted = self.read(path.to_path_buf()).await?;
        let batch = self.assembler.assemble(&extracted, tag, explicit_id)?;
        let handle = self.manager.ensure(collection).await?;
        let ack = self.manager.add(&handle, &batch.documents, &batch.metadatas, &batch.ids).await?;
        info!(path = %path.display(), collection, units = batch.len(), stored = ack.count, "ingest finished");
        Ok(IngestReport { collection: ack.collection, ids: batch.ids, count: ack.count })
    }

    /// File parsing is blocking work; keep it off the async workers.
    async fn read(&self, path: PathBuf) -> Result<ExtractedDocument> {
        let reader = self.reader;
        let shown = path.display().to_string();
        tokio::task::spawn_blocking(move || reader.read(&path))
            .await
            .map_err(|e| Error::extraction(shown, format!("reader task failed: {}", e)))?
    }
}
