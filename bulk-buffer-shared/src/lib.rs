//! # Bulk Buffer Shared
//!
//! Document and input batch types shared by the buffer core and the
//! backend client crates.

mod bundle;
mod document;
mod tabular;

pub use bundle::DocumentBundle;
pub use document::{Document, ID_FIELD, INDEX_FIELD, RESERVED_FIELDS, ROUTING_FIELD};
pub use tabular::{RowIndex, Series, TabularBatch};

pub use serde_json::Value;
