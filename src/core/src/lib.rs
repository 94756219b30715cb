//! # rolegen core
//!
//! Shared types, traits, and error handling for the rolegen workspace.
//! The raw definition records defined here are the contract between the
//! definition loaders and the generation engine, which keeps the engine free
//! of any file-format dependency.

pub mod types;
pub mod traits;
pub mod error;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{RawDefinition, RawRule};
pub use traits::DefinitionSource;
