use arrow_schema::{DataType, Field, Schema};
use std::collections::HashMap;
use std::sync::Arc;

use docstore_core::types::DistanceMetric;

pub const ID_COLUMN: &str = "id";
pub const TEXT_COLUMN: &str = "text";
pub const METADATA_COLUMN: &str = "metadata";
pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Schema-level metadata key recording the collection's distance metric.
pub const METRIC_KEY: &str = "docstore.metric";

/// One table per collection; the dimension lives in the vector column type.
pub fn collection_schema(dimension: usize, metric: DistanceMetric) -> Arc<Schema> {
    let fields = vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(TEXT_COLUMN, DataType::Utf8, false),
        Field::new(METADATA_COLUMN, DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimension as i32),
            true,
        ),
    ];
    let metadata = HashMap::from([(METRIC_KEY.to_string(), metric.as_str().to_string())]);
    Arc::new(Schema::new(fields).with_metadata(metadata))
}

/// Declared dimension, read back from the vector column.
pub fn dimension_of(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}

/// Tables written before the metric was recorded read as cosine.
pub fn metric_of(schema: &Schema) -> DistanceMetric {
    schema.metadata().get(METRIC_KEY).and_then(|m| DistanceMetric::parse(m)).unwrap_or_default()
}
