//! Ingestion and retrieval on top of the collection manager.

pub mod ingest;
pub mod retrieve;

pub use ingest::{IngestReport, IngestionService};
pub use retrieve::RetrievalService;
