//! Input readers.
//!
//! NDJSON input yields one bundle per line. CSV input yields a single table
//! whose cells are typed as integers, floats or booleans where they parse,
//! and strings otherwise.

use std::io::{BufRead, Read};

use clap::ValueEnum;
use serde_json::Value;
use tracing::debug;

use crate::LoadError;
use bulk_buffer_shared::{DocumentBundle, RowIndex, TabularBatch};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One JSON object (or array of objects) per line.
    Ndjson,
    /// Comma-separated values with a header row.
    Csv,
}

/// Read bundles in `format` from `reader`.
pub fn read_bundles<R: BufRead>(
    reader: R,
    format: InputFormat,
    index_column: Option<&str>,
) -> Result<Vec<DocumentBundle>, LoadError> {
    match format {
        InputFormat::Ndjson => read_ndjson(reader),
        InputFormat::Csv => Ok(vec![read_csv(reader, index_column)?.into()]),
    }
}

/// Read newline-delimited JSON. Blank lines are skipped.
pub fn read_ndjson<R: BufRead>(reader: R) -> Result<Vec<DocumentBundle>, LoadError> {
    let mut bundles = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(&line).map_err(|e| LoadError::input(number + 1, e.to_string()))?;
        bundles.push(DocumentBundle::Json(value));
    }

    debug!(records = bundles.len(), "Read NDJSON input");
    Ok(bundles)
}

/// Read CSV with a header row into a table.
///
/// When `index_column` is given, that column becomes the table's named index.
pub fn read_csv<R: Read>(reader: R, index_column: Option<&str>) -> Result<TabularBatch, LoadError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let index_position = match index_column {
        Some(name) => Some(
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| LoadError::config(format!("index column `{}` not found in CSV header", name)))?,
        ),
        None => None,
    };

    let mut labels = Vec::new();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<Value> = record.iter().map(parse_cell).collect();
        if let Some(position) = index_position {
            labels.push(row.remove(position));
        }
        rows.push(row);
    }

    let columns = headers
        .into_iter()
        .enumerate()
        .filter(|(position, _)| Some(*position) != index_position)
        .map(|(_, header)| header);
    let mut batch = TabularBatch::new(columns, rows);
    if let Some(name) = index_column {
        batch = batch.with_index(RowIndex::named(name, labels));
    }

    debug!(rows = batch.len(), columns = batch.columns.len(), "Read CSV input");
    Ok(batch)
}

/// Type a CSV cell. Empty cells become null.
pub fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(integer) = cell.parse::<i64>() {
        return Value::from(integer);
    }
    if let Ok(float) = cell.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}
