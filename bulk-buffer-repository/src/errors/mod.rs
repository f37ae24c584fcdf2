//! Error types for the bulk buffer repository.

mod backend_error;
mod persistence_error;

pub use backend_error::BackendError;
pub use persistence_error::PersistenceError;
