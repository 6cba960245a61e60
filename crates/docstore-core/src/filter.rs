//! Metadata predicates applied to stored documents during retrieval.
//!
//! `must` conditions are AND-ed and `must_not` conditions are AND-NOT-ed.
//! A condition on a field the document does not carry never matches.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::Meta;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterClause {
    #[serde(default)]
    pub must: Vec<FilterCondition>,
    #[serde(default)]
    pub must_not: Vec<FilterCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
}

impl FilterClause {
    /// Shorthand for a single `field == value` condition.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            must: vec![FilterCondition { field: field.into(), op: FilterOperator::Eq, value: Some(value.into()), values: None }],
            must_not: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    pub fn matches(&self, metadata: &Meta) -> bool {
        self.must.iter().all(|c| c.matches(metadata)) && !self.must_not.iter().any(|c| c.matches(metadata))
    }
}

impl FilterCondition {
    pub fn matches(&self, metadata: &Meta) -> bool {
        let Some(field) = metadata.get(&self.field) else { return false };
        match self.op {
            FilterOperator::Eq => self.value.as_ref().is_some_and(|v| json_eq(field, v)),
            FilterOperator::Ne => self.value.as_ref().is_some_and(|v| !json_eq(field, v)),
            FilterOperator::Gt => self.compare(field, |o| o == Ordering::Greater),
            FilterOperator::Lt => self.compare(field, |o| o == Ordering::Less),
            FilterOperator::Gte => self.compare(field, |o| o != Ordering::Less),
            FilterOperator::Lte => self.compare(field, |o| o != Ordering::Greater),
            FilterOperator::In => self.values.as_ref().is_some_and(|vs| vs.iter().any(|v| json_eq(field, v))),
        }
    }

    fn compare(&self, field: &serde_json::Value, accept: impl Fn(Ordering) -> bool) -> bool {
        let (Some(lhs), Some(rhs)) = (field.as_number(), self.value.as_ref().and_then(serde_json::Value::as_number)) else {
            return false;
        };
        number_cmp(lhs, rhs).is_some_and(accept)
    }
}

// Numbers compare by value so that `1` and `1.0` are equal.
fn json_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => number_cmp(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Integers compare exactly; only floats and mixed pairs go through `f64`.
fn number_cmp(a: &serde_json::Number, b: &serde_json::Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}
