//! The accepted input shapes for a single `add` call.

use serde_json::Value;

use crate::document::Document;
use crate::tabular::{Series, TabularBatch};

/// Input accepted by the buffer.
///
/// `Json` carries untyped input (for example a line read from a file); it must
/// be an object or an array of objects, which the normalizer checks.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBundle {
    One(Document),
    Many(Vec<Document>),
    Series(Series),
    Table(TabularBatch),
    Json(Value),
}

impl From<Document> for DocumentBundle {
    fn from(document: Document) -> Self {
        Self::One(document)
    }
}

impl From<Vec<Document>> for DocumentBundle {
    fn from(documents: Vec<Document>) -> Self {
        Self::Many(documents)
    }
}

impl From<Series> for DocumentBundle {
    fn from(series: Series) -> Self {
        Self::Series(series)
    }
}

impl From<TabularBatch> for DocumentBundle {
    fn from(batch: TabularBatch) -> Self {
        Self::Table(batch)
    }
}

impl From<Value> for DocumentBundle {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
