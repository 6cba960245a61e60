//! Domain types shared by the reader, the collection manager and the engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocumentId = String;
pub type Meta = HashMap<String, serde_json::Value>;

/// Metadata key holding the resolved document id.
pub const META_ID: &str = "id";
/// Metadata key holding the caller-supplied content tag.
pub const META_CONTENT_TAG: &str = "content_tag";

/// Distance function a collection ranks neighbors by.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cosine" => Some(Self::Cosine),
            _ => None,
        }
    }

    /// Distance between two equal-length vectors; 0 means identical direction.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (norm_a * norm_b)
            }
        }
    }
}

/// One plain-text unit produced by a format reader.
///
/// `fields` holds format-specific enrichment (titles, page counts) that the
/// assembler layers onto the unit's metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextUnit {
    pub text: String,
    pub fields: Meta,
}

impl TextUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), fields: Meta::new() }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Provenance of an extracted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub file_name: String,
    pub format: String,
    pub size_bytes: u64,
    /// Last modification time, seconds since the Unix epoch.
    pub modified_at: Option<i64>,
}

/// Everything a format reader got out of one file, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub source: SourceInfo,
    pub units: Vec<TextUnit>,
}

impl ExtractedDocument {
    pub fn texts(&self) -> Vec<String> {
        self.units.iter().map(|u| u.text.clone()).collect()
    }
}

/// A stored document as materialized by `list_documents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    pub metadata: Meta,
}

/// One nearest-neighbor hit. Lower `distance` is more similar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub id: DocumentId,
    pub text: String,
    pub metadata: Meta,
    pub distance: f32,
}

/// Descriptor of a collection as declared in the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_of_identical_vectors_is_zero() {
        let v = [0.3f32, -0.2, 0.9];
        assert!(DistanceMetric::Cosine.distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_of_opposite_vectors_is_two() {
        let a = [1.0f32, 0.0];
        let b = [-1.0f32, 0.0];
        assert!((DistanceMetric::Cosine.distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn metric_round_trips_through_its_name() {
        assert_eq!(DistanceMetric::parse(DistanceMetric::Cosine.as_str()), Some(DistanceMetric::Cosine));
        assert_eq!(DistanceMetric::parse("l2"), None);
    }
}
