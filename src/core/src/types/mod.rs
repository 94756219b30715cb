//! Shared types for the rolegen workspace

pub mod definition;

// Re-export commonly used types
pub use definition::{RawDefinition, RawRule};
