//! Turns extracted text units into `(documents, ids, metadatas)` batches.
//!
//! Generated ids are `{tag}_{index}` starting at 0 and are unique only within
//! one call; collisions across calls resolve last-write-wins in the engine.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{ExtractedDocument, Meta, META_CONTENT_TAG, META_ID};

/// What to do when a caller supplies one id for a multi-unit batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExplicitIdPolicy {
    /// Every unit gets the supplied id; the store keeps the last unit.
    #[default]
    Shared,
    /// Multi-unit input with an explicit id is a validation error.
    RejectMultiUnit,
}

/// Parallel lists ready for `CollectionManager::add`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledBatch {
    pub documents: Vec<String>,
    pub ids: Vec<String>,
    pub metadatas: Vec<Meta>,
}

impl AssembledBatch {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    policy: ExplicitIdPolicy,
}

impl DocumentAssembler {
    pub fn new(policy: ExplicitIdPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ExplicitIdPolicy {
        self.policy
    }

    pub fn assign_ids(&self, count: usize, tag: &str, explicit_id: Option<&str>) -> Result<Vec<String>> {
        if tag.trim().is_empty() {
            return Err(Error::Validation("content tag must not be empty".into()));
        }
        match explicit_id {
            Some(id) if id.trim().is_empty() => Err(Error::Validation("explicit id must not be empty".into())),
            Some(id) => {
                if count > 1 {
                    match self.policy {
                        ExplicitIdPolicy::RejectMultiUnit => {
                            return Err(Error::Validation(format!(
                                "explicit id '{}' given for {} units; only single-unit input may carry an explicit id",
                                id, count
                            )))
                        }
                        ExplicitIdPolicy::Shared => {
                            warn!(id, count, "explicit id shared by every unit; only the last unit will be kept");
                        }
                    }
                }
                Ok(vec![id.to_string(); count])
            }
            None => Ok((0..count).map(|i| format!("{}_{}", tag, i)).collect()),
        }
    }

    pub fn assemble(&self, extracted: &ExtractedDocument, tag: &str, explicit_id: Option<&str>) -> Result<AssembledBatch> {
        if extracted.units.is_empty() {
            return Err(Error::Validation(format!("'{}' produced no text units", extracted.source.file_name)));
        }
        let total = extracted.units.len();
        let ids = self.assign_ids(total, tag, explicit_id)?;
        let mut batch = AssembledBatch::default();
        for (index, (unit, id)) in extracted.units.iter().zip(ids).enumerate() {
            let mut meta = unit.fields.clone();
            meta.insert("source".into(), extracted.source.file_name.clone().into());
            meta.insert("format".into(), extracted.source.format.clone().into());
            meta.insert("file_size".into(), extracted.source.size_bytes.into());
            if let Some(ts) = extracted.source.modified_at {
                meta.insert("modified_at".into(), ts.into());
            }
            meta.insert("unit_index".into(), index.into());
            meta.insert("total_units".into(), total.into());
            // Required keys go last so unit fields can never shadow them.
            meta.insert(META_ID.into(), id.clone().into());
            meta.insert(META_CONTENT_TAG.into(), tag.into());

            batch.documents.push(unit.text.clone());
            batch.ids.push(id);
            batch.metadatas.push(meta);
        }
        Ok(batch)
    }
}
