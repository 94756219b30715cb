//! Shared traits for the rolegen workspace

pub mod source;

// Re-export commonly used traits
pub use source::DefinitionSource;
