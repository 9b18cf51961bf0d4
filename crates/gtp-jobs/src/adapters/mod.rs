//! Extraction adapters.

pub mod command;

pub use command::{classify_exit, CommandExtractionAdapter};
