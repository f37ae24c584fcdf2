//! # Bulk Buffer Core
//!
//! A bounded document buffer that accumulates records and writes them to an
//! indexing backend in a single bulk request when it fills up, when flushed
//! by hand, or when its scope ends.
//!
//! ## Architecture
//!
//! 1. **Normalizer**: Turns maps, columns and tables into flat documents
//! 2. **Metadata**: Adds computed fields (`_index`, `_id`, ...) to every document
//! 3. **Buffer**: Holds documents and triggers a flush at capacity
//! 4. **Flush**: Submits the bulk write and interprets partial failures
//! 5. **Lifecycle**: Flushes on clean scope exit, dumps contents on error
//!
//! All work happens inside the caller's futures: there are no background
//! tasks and no timers. A buffer is mutated through `&mut self`, so callers
//! with several producers must serialize access themselves.

pub mod buffer;
pub mod errors;
pub mod flush;
pub mod lifecycle;
pub mod metadata;
pub mod normalizer;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{BufferConfig, BulkBuffer, BulkBufferBuilder};
pub use errors::{BufferError, FlushError, FlushFailure, MetadataFnError};
pub use flush::{FlushOutcome, DUMP_HINT};
pub use lifecycle::{BufferScope, ScopeError};
pub use metadata::{MetadataFn, MetadataInjector};

pub use bulk_buffer_repository::{BulkWriter, DumpSink, PersistenceError};
pub use bulk_buffer_shared::{Document, DocumentBundle, RowIndex, Series, TabularBatch};
