//! Document normalizer.
//!
//! Converts every accepted input shape into an ordered sequence of flat
//! documents. Nested objects are flattened into dotted field names, which the
//! backend maps the same way as the nested form.

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::errors::BufferError;
use bulk_buffer_shared::{Document, DocumentBundle, TabularBatch};

/// Separator between path segments of flattened field names.
pub const FIELD_SEPARATOR: char = '.';

/// Normalize an input bundle into flat documents, preserving input order.
///
/// # Returns
///
/// * `Ok(Vec<Document>)` - One document per input record or table row
/// * `Err(BufferError::InvalidInput)` - If the input shape is unsupported or a table is not rectangular
#[instrument(skip(bundle))]
pub fn normalize(bundle: DocumentBundle) -> Result<Vec<Document>, BufferError> {
    let documents = match bundle {
        DocumentBundle::One(document) => vec![flatten(document)?],
        DocumentBundle::Many(documents) => documents
            .into_iter()
            .map(flatten)
            .collect::<Result<_, _>>()?,
        DocumentBundle::Series(series) => table_to_documents(series.into_frame())?,
        DocumentBundle::Table(batch) => table_to_documents(batch)?,
        DocumentBundle::Json(value) => json_to_documents(value)?,
    };

    debug!(count = documents.len(), "Normalized input batch");
    Ok(documents)
}

/// Flatten nested objects into dotted field names.
///
/// Empty nested objects contribute no fields. Arrays are kept as values.
///
/// # Returns
///
/// * `Err(BufferError::InvalidInput)` - If a flattened name is already used by another field
pub fn flatten(document: Document) -> Result<Document, BufferError> {
    if !document.values().any(Value::is_object) {
        return Ok(document);
    }

    let mut flat = Map::with_capacity(document.len());
    for (field, value) in document {
        flatten_into(&mut flat, field, value)?;
    }
    Ok(flat)
}

fn flatten_into(flat: &mut Document, path: String, value: Value) -> Result<(), BufferError> {
    match value {
        Value::Object(nested) => {
            for (field, value) in nested {
                flatten_into(flat, format!("{}{}{}", path, FIELD_SEPARATOR, field), value)?;
            }
        }
        value => {
            if flat.contains_key(&path) {
                return Err(BufferError::invalid_input(format!(
                    "flattened field `{}` collides with an existing field",
                    path
                )));
            }
            flat.insert(path, value);
        }
    }
    Ok(())
}

fn json_to_documents(value: Value) -> Result<Vec<Document>, BufferError> {
    match value {
        Value::Object(document) => Ok(vec![flatten(document)?]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(position, item)| match item {
                Value::Object(document) => flatten(document),
                other => Err(BufferError::invalid_input(format!(
                    "element {} is a {}, expected an object",
                    position,
                    kind(&other)
                ))),
            })
            .collect(),
        other => Err(BufferError::invalid_input(format!(
            "must pass an object, an array of objects, a series or a table; got a {}",
            kind(&other)
        ))),
    }
}

/// Convert table rows into documents.
///
/// A named index is inserted as the first field of each document; an
/// unnamed index is dropped.
fn table_to_documents(batch: TabularBatch) -> Result<Vec<Document>, BufferError> {
    let TabularBatch {
        columns,
        rows,
        index,
    } = batch;

    let mut seen = HashSet::with_capacity(columns.len());
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(BufferError::invalid_input(format!(
                "duplicate column name `{}`",
                column
            )));
        }
    }

    let index = match index {
        Some(index) => {
            if index.labels.len() != rows.len() {
                return Err(BufferError::invalid_input(format!(
                    "index has {} labels for {} rows",
                    index.labels.len(),
                    rows.len()
                )));
            }
            match index.name {
                Some(name) if seen.contains(name.as_str()) => {
                    return Err(BufferError::invalid_input(format!(
                        "index name `{}` already exists as a column",
                        name
                    )));
                }
                Some(name) => Some((name, index.labels)),
                None => None,
            }
        }
        None => None,
    };

    let mut labels = index.as_ref().map(|(_, labels)| labels.iter());
    let mut documents = Vec::with_capacity(rows.len());

    for (position, row) in rows.into_iter().enumerate() {
        if row.len() != columns.len() {
            return Err(BufferError::invalid_input(format!(
                "row {} has {} values for {} columns",
                position,
                row.len(),
                columns.len()
            )));
        }

        let mut document = Map::with_capacity(columns.len() + 1);
        if let (Some((name, _)), Some(labels)) = (&index, labels.as_mut()) {
            if let Some(label) = labels.next() {
                document.insert(name.clone(), label.clone());
            }
        }
        for (column, value) in columns.iter().zip(row) {
            document.insert(column.clone(), value);
        }
        documents.push(flatten(document)?);
    }

    Ok(documents)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
