//! Flat key/value documents and the reserved field names the backend reads.

use serde_json::{Map, Value};

/// An ordered mapping from field name to value.
///
/// Field order is insertion order. After normalization no value is a JSON object.
pub type Document = Map<String, Value>;

/// Field naming the destination index of a document.
pub const INDEX_FIELD: &str = "_index";

/// Field naming the identifier of a document within its index.
pub const ID_FIELD: &str = "_id";

/// Field naming the shard routing key of a document.
pub const ROUTING_FIELD: &str = "_routing";

/// Fields stripped from the document source and moved into the bulk action line.
pub const RESERVED_FIELDS: [&str; 3] = [INDEX_FIELD, ID_FIELD, ROUTING_FIELD];
