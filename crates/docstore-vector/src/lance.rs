//! LanceDB engine: one table per collection.
//!
//! Rows are `(id, text, metadata, vector)` with metadata stored as a JSON
//! string. Upserts go through `merge_insert` keyed on `id`. Metadata filters
//! are evaluated here and pushed down to Lance as an `id IN (...)` predicate.

use std::path::Path;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::SchemaRef;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};
use tracing::{debug, info};

use docstore_core::error::{Error, Result};
use docstore_core::filter::FilterClause;
use docstore_core::traits::VectorStore;
use docstore_core::types::{CollectionInfo, DistanceMetric, Document, Meta, RetrievalResult};

use crate::schema::{
    collection_schema, dimension_of, metric_of, DISTANCE_COLUMN, ID_COLUMN, METADATA_COLUMN, TEXT_COLUMN,
};

const ENGINE: &str = "lancedb";

pub struct LanceStore {
    uri: String,
    db: Connection,
}

impl LanceStore {
    /// Open (or create) the database at `uri`. Local directories are created.
    pub async fn connect(uri: &Path) -> Result<Self> {
        std::fs::create_dir_all(uri).map_err(|e| Error::unavailable(ENGINE, e))?;
        let uri = uri.to_string_lossy().to_string();
        let db = connect(&uri).execute().await.map_err(|e| Error::unavailable(ENGINE, e))?;
        info!(uri = %uri, "connected to LanceDB");
        Ok(Self { uri, db })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.db.table_names().execute().await.map_err(lance_err)
    }

    async fn open(&self, name: &str) -> Result<Table> {
        self.db.open_table(name).execute().await.map_err(|e| match e {
            lancedb::Error::TableNotFound { .. } => Error::CollectionNotFound(name.to_string()),
            other => lance_err(other),
        })
    }

    async fn describe(&self, name: &str, table: &Table) -> Result<CollectionInfo> {
        let schema = table.schema().await.map_err(lance_err)?;
        let dimension = dimension_of(&schema)
            .ok_or_else(|| Error::engine(ENGINE, anyhow::anyhow!("table '{}' has no fixed-size vector column", name)))?;
        let size = table.count_rows(None).await.map_err(lance_err)?;
        Ok(CollectionInfo { name: name.to_string(), dimension, metric: metric_of(&schema), size })
    }

    /// Ids of rows whose metadata satisfies `filter`.
    async fn matching_ids(&self, table: &Table, filter: &FilterClause) -> Result<Vec<String>> {
        let mut stream = table
            .query()
            .select(Select::columns(&[ID_COLUMN, METADATA_COLUMN]))
            .execute()
            .await
            .map_err(lance_err)?;
        let mut ids = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
            let id_col = string_column(&batch, ID_COLUMN)?;
            let meta_col = string_column(&batch, METADATA_COLUMN)?;
            for i in 0..batch.num_rows() {
                if filter.matches(&parse_meta(meta_col.value(i))?) {
                    ids.push(id_col.value(i).to_string());
                }
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    fn name(&self) -> &'static str {
        ENGINE
    }

    async fn get_or_create_collection(&self, name: &str, dimension: usize, metric: DistanceMetric) -> Result<CollectionInfo> {
        if !self.table_names().await?.iter().any(|n| n == name) {
            // create empty table with 0 rows
            let schema = collection_schema(dimension, metric);
            let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
            match self.db.create_table(name, Box::new(iter)).execute().await {
                Ok(_) => info!(collection = name, dimension, metric = metric.as_str(), "created collection"),
                // Lost a creation race; the winner's declaration stands.
                Err(lancedb::Error::TableAlreadyExists { .. }) => {}
                Err(e) => return Err(lance_err(e)),
            }
        }
        let table = self.open(name).await?;
        self.describe(name, &table).await
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        if !self.table_names().await?.iter().any(|n| n == name) {
            return Ok(None);
        }
        let table = self.open(name).await?;
        Ok(Some(self.describe(name, &table).await?))
    }

    async fn add(&self, collection: &str, ids: &[String], vectors: &[Vec<f32>], documents: &[String], metadatas: &[Meta]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let table = self.open(collection).await?;
        let schema = table.schema().await.map_err(lance_err)?;
        let dimension = dimension_of(&schema).unwrap_or_default();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: dimension, actual: bad.len() });
        }
        let batch = to_record_batch(schema.clone(), dimension, ids, vectors, documents, metadatas)?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        // Upsert behavior via merge_insert: id is unique
        let mut mi = table.merge_insert(&[ID_COLUMN]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(lance_err)?;
        debug!(collection, rows = ids.len(), "merged rows");
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize, filter: Option<&FilterClause>) -> Result<Vec<RetrievalResult>> {
        let table = self.open(collection).await?;
        if table.count_rows(None).await.map_err(lance_err)? == 0 {
            return Ok(Vec::new());
        }
        let predicate = match filter {
            Some(f) if !f.is_empty() => {
                let ids = self.matching_ids(&table, f).await?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                Some(id_in(&ids))
            }
            _ => None,
        };
        let mut search = table
            .vector_search(embedding.to_vec())
            .map_err(lance_err)?
            .distance_type(DistanceType::Cosine)
            .select(Select::columns(&[ID_COLUMN, TEXT_COLUMN, METADATA_COLUMN]))
            .limit(k);
        if let Some(p) = predicate {
            search = search.only_if(p);
        }
        let mut stream = search.execute().await.map_err(lance_err)?;
        let mut results = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
            let ids = string_column(&batch, ID_COLUMN)?;
            let texts = string_column(&batch, TEXT_COLUMN)?;
            let metas = string_column(&batch, METADATA_COLUMN)?;
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| Error::engine(ENGINE, anyhow::anyhow!("{} column missing", DISTANCE_COLUMN)))?;
            for i in 0..batch.num_rows() {
                results.push(RetrievalResult {
                    id: ids.value(i).to_string(),
                    text: texts.value(i).to_string(),
                    metadata: parse_meta(metas.value(i))?,
                    distance: distances.value(i),
                });
            }
        }
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        results.truncate(k);
        Ok(results)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let table = self.open(collection).await?;
        table.delete(&id_in(ids)).await.map_err(lance_err)?;
        debug!(collection, requested = ids.len(), "deleted rows");
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut out = Vec::new();
        for name in self.table_names().await? {
            let table = self.open(&name).await?;
            out.push(self.describe(&name, &table).await?);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get(&self, collection: &str) -> Result<Vec<Document>> {
        let table = self.open(collection).await?;
        let mut stream = table
            .query()
            .select(Select::columns(&[ID_COLUMN, TEXT_COLUMN, METADATA_COLUMN]))
            .execute()
            .await
            .map_err(lance_err)?;
        let mut docs = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
            let ids = string_column(&batch, ID_COLUMN)?;
            let texts = string_column(&batch, TEXT_COLUMN)?;
            let metas = string_column(&batch, METADATA_COLUMN)?;
            for i in 0..batch.num_rows() {
                docs.push(Document {
                    id: ids.value(i).to_string(),
                    text: texts.value(i).to_string(),
                    metadata: parse_meta(metas.value(i))?,
                });
            }
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }
}

fn lance_err(e: lancedb::Error) -> Error {
    Error::engine(ENGINE, e)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::engine(ENGINE, anyhow::anyhow!("{} column missing", name)))
}

fn parse_meta(raw: &str) -> Result<Meta> {
    serde_json::from_str(raw).map_err(|e| Error::engine(ENGINE, anyhow::anyhow!("corrupt metadata: {}", e)))
}

/// `id IN ('a', 'b')` with single quotes escaped.
fn id_in(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect();
    format!("{} IN ({})", ID_COLUMN, quoted.join(", "))
}

fn to_record_batch(
    schema: SchemaRef,
    dimension: usize,
    ids: &[String],
    vectors: &[Vec<f32>],
    documents: &[String],
    metadatas: &[Meta],
) -> Result<RecordBatch> {
    let metadata = metadatas
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::engine(ENGINE, e))?;
    let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
        vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>())),
        dimension as i32,
    );
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids.to_vec())),
            Arc::new(StringArray::from(documents.to_vec())),
            Arc::new(StringArray::from(metadata)),
            Arc::new(vectors),
        ],
    )
    .map_err(|e| Error::engine(ENGINE, e))
}
