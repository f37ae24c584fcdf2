//! Column-oriented input batches.
//!
//! A `TabularBatch` is a rectangular set of rows under named columns, with an
//! optional row index. A `Series` is a single column. Neither type validates
//! its shape on construction; the normalizer rejects malformed batches when
//! converting them into documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row labels of a tabular batch.
///
/// A named index becomes an ordinary field when the batch is converted into
/// documents. An unnamed index is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIndex {
    /// Index name, used as the field name when present.
    pub name: Option<String>,
    /// One label per row.
    pub labels: Vec<Value>,
}

impl RowIndex {
    /// Create a named index.
    pub fn named(name: impl Into<String>, labels: Vec<Value>) -> Self {
        Self {
            name: Some(name.into()),
            labels,
        }
    }

    /// Create an unnamed index.
    pub fn unnamed(labels: Vec<Value>) -> Self {
        Self { name: None, labels }
    }
}

/// Rows of values under named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularBatch {
    /// Column names, in field order.
    pub columns: Vec<String>,
    /// Row values, each row aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
    /// Optional row labels.
    pub index: Option<RowIndex>,
}

impl TabularBatch {
    /// Create a batch without a row index.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
            index: None,
        }
    }

    /// Attach a row index.
    pub fn with_index(mut self, index: RowIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single column of values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Column name. An unnamed series converts to a column named `"0"`.
    pub name: Option<String>,
    pub values: Vec<Value>,
    pub index: Option<RowIndex>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: Some(name.into()),
            values,
            index: None,
        }
    }

    pub fn unnamed(values: Vec<Value>) -> Self {
        Self {
            name: None,
            values,
            index: None,
        }
    }

    pub fn with_index(mut self, index: RowIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Convert into a one-column batch.
    pub fn into_frame(self) -> TabularBatch {
        let column = self.name.unwrap_or_else(|| "0".to_string());
        TabularBatch {
            columns: vec![column],
            rows: self.values.into_iter().map(|value| vec![value]).collect(),
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_series_into_frame_named() {
        let frame = Series::new("score", vec![json!(1), json!(2)]).into_frame();

        assert_eq!(frame.columns, vec!["score".to_string()]);
        assert_eq!(frame.rows, vec![vec![json!(1)], vec![json!(2)]]);
        assert!(frame.index.is_none());
    }

    #[test]
    fn test_series_into_frame_unnamed_keeps_index() {
        let frame = Series::unnamed(vec![json!("x")])
            .with_index(RowIndex::named("row", vec![json!(7)]))
            .into_frame();

        assert_eq!(frame.columns, vec!["0".to_string()]);
        assert_eq!(frame.index.unwrap().name.as_deref(), Some("row"));
    }

    #[test]
    fn test_tabular_len() {
        let batch = TabularBatch::new(["a", "b"], vec![vec![json!(1), json!(2)]]);
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert!(TabularBatch::default().is_empty());
    }
}
