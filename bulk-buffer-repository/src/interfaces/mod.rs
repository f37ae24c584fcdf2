//! Interface definitions for the bulk buffer's external collaborators.
//!
//! These traits allow the buffer to be wired to any indexing backend and any
//! durable dump target, and to be tested against mock implementations.

mod bulk_writer;
mod dump_sink;

pub use bulk_writer::BulkWriter;
pub use dump_sink::DumpSink;
