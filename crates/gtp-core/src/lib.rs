//! # gtp-core
//!
//! Core types, traits, and abstractions for raw chain extraction.
//!
//! This crate provides the foundational data structures and the collaborator
//! traits (extraction operation, chain configuration, sleeping, alerting)
//! that the other gtp crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
