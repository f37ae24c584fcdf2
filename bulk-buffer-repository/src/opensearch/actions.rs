//! Bulk action composition and response parsing.
//!
//! Each document becomes two NDJSON lines in the bulk body: an action line
//! carrying the reserved fields, and the document source without them.

use serde_json::{json, Map, Value};

use crate::errors::BackendError;
use crate::types::BulkItemFailure;
use bulk_buffer_shared::{Document, ID_FIELD, INDEX_FIELD, RESERVED_FIELDS, ROUTING_FIELD};

/// One document ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BulkAction {
    pub index: String,
    pub id: Option<String>,
    pub action: Value,
    pub source: Value,
}

impl BulkAction {
    /// Build the failure record for this action at `position`.
    pub fn failure(&self, position: usize, status: Option<u16>, reason: impl Into<String>) -> BulkItemFailure {
        BulkItemFailure {
            position,
            index: Some(self.index.clone()),
            id: self.id.clone(),
            status,
            reason: reason.into(),
        }
    }
}

/// Outcome of a single item in a bulk response.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemOutcome {
    Written,
    Rejected { status: Option<u16>, reason: String },
}

/// Render a reserved field value as the string the bulk API expects.
fn reserved_value(document: &Document, field: &str) -> Result<Option<String>, String> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(format!(
            "{} must be a string or number, got {}",
            field, other
        )),
    }
}

/// Compose the bulk action for a document.
///
/// Returns the rejection reason when the destination index cannot be resolved
/// or a reserved field has an unusable value.
pub(crate) fn compose(document: &Document, default_index: Option<&str>) -> Result<BulkAction, String> {
    let index = match reserved_value(document, INDEX_FIELD)? {
        Some(index) => index,
        None => default_index
            .map(str::to_string)
            .ok_or_else(|| "document has no _index and no default index is configured".to_string())?,
    };
    let id = reserved_value(document, ID_FIELD)?;
    let routing = reserved_value(document, ROUTING_FIELD)?;

    let mut meta = Map::new();
    meta.insert(INDEX_FIELD.to_string(), json!(index));
    if let Some(ref id) = id {
        meta.insert(ID_FIELD.to_string(), json!(id));
    }
    if let Some(routing) = routing {
        meta.insert("routing".to_string(), json!(routing));
    }

    let source: Map<String, Value> = document
        .iter()
        .filter(|(field, _)| !RESERVED_FIELDS.contains(&field.as_str()))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();

    Ok(BulkAction {
        index,
        id,
        action: json!({ "index": meta }),
        source: Value::Object(source),
    })
}

/// Parse the `items` array of a bulk response.
///
/// Items are returned in request order, so the outcome at offset `i`
/// belongs to the `i`-th action sent.
pub(crate) fn parse_items(response: &Value, expected: usize) -> Result<Vec<ItemOutcome>, BackendError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::parse("bulk response has no items array"))?;

    if items.len() != expected {
        return Err(BackendError::parse(format!(
            "bulk response has {} items for {} actions",
            items.len(),
            expected
        )));
    }

    items
        .iter()
        .map(|item| {
            let result = item
                .as_object()
                .and_then(|op| op.values().next())
                .ok_or_else(|| BackendError::parse(format!("malformed bulk item: {}", item)))?;

            let status = result
                .get("status")
                .and_then(Value::as_u64)
                .map(|s| s as u16);

            match result.get("error") {
                Some(error) => Ok(ItemOutcome::Rejected {
                    status,
                    reason: error_reason(error),
                }),
                None if status.is_some_and(|s| s >= 300) => Ok(ItemOutcome::Rejected {
                    status,
                    reason: format!("item returned status {}", status.unwrap_or_default()),
                }),
                None => Ok(ItemOutcome::Written),
            }
        })
        .collect()
}

fn error_reason(error: &Value) -> String {
    let kind = error.get("type").and_then(Value::as_str);
    let reason = error.get("reason").and_then(Value::as_str);
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (None, Some(reason)) => reason.to_string(),
        _ => error.to_string(),
    }
}
