use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StoreResult;

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Gte => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// With `merge`, top-level `fields` are layered over the existing
    /// document; without it the document is replaced.
    async fn put(&self, collection: &str, id: &str, fields: Document, merge: bool)
    -> StoreResult<()>;

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<DocumentSnapshot>>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Filters and orders an id-ordered document list the same way for every
/// backend. Documents without the ordering field sort first.
pub(crate) fn apply_query(
    docs: Vec<DocumentSnapshot>,
    filters: &[Filter],
    order_by: Option<&OrderBy>,
) -> Vec<DocumentSnapshot> {
    let mut matched: Vec<DocumentSnapshot> = docs
        .into_iter()
        .filter(|doc| filters.iter().all(|f| f.matches(&doc.data)))
        .collect();

    if let Some(order) = order_by {
        matched.sort_by(|a, b| {
            let left = a.data.get(&order.field);
            let right = b.data.get(&order.field);
            let ordering = match (left, right) {
                (Some(l), Some(r)) => compare_values(l, r)
                    .unwrap_or_else(|| kind_rank(left).cmp(&kind_rank(right))),
                _ => kind_rank(left).cmp(&kind_rank(right)),
            };
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    matched
}

pub(crate) fn merge_into(existing: &mut Document, fields: Document) {
    for (key, value) in fields {
        existing.insert(key, value);
    }
}
