//! Configuration and dependency wiring for the loader.

mod dependencies;

pub use dependencies::{Dependencies, LoadSettings};
