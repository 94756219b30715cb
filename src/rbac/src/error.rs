//! Error types for the generation engine

use crate::definition::DefinitionRef;
use crate::graph::{Violation, ViolationKind};
use thiserror::Error;

/// Generation engine errors
///
/// Only structural problems surface here. Graph problems (duplicate owners,
/// unresolved reuse) are collected into a `ValidationResult` instead so a
/// single run reports all of them.
#[derive(Debug, Error)]
pub enum RolegenError {
    /// A raw record could not be normalized; aborts the run
    #[error("Malformed definition {definition}: {reason}")]
    MalformedDefinition {
        definition: DefinitionRef,
        reason: String,
    },

    /// Template referenced at synthesis time is missing from the catalog
    #[error("Unknown template '{template}' referenced by {definition}")]
    UnknownTemplate {
        definition: DefinitionRef,
        template: String,
    },

    /// Synthesis was attempted over a graph that still has violations
    #[error("Refusing to synthesize: reference graph has {0} unresolved or duplicate edges")]
    UnvalidatedGraph(usize),

    /// Invalid template catalog or generator settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Manifest rendering error
    #[error("Render error: {0}")]
    Render(#[from] serde_yaml::Error),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from a loader or writer collaborator
    #[error(transparent)]
    Core(#[from] rolegen_core::CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RolegenError {
    /// Create a malformed-definition error
    pub fn malformed(definition: DefinitionRef, reason: impl Into<String>) -> Self {
        RolegenError::MalformedDefinition {
            definition,
            reason: reason.into(),
        }
    }

    /// Express a fail-fast error in the same shape as collected violations
    pub fn as_violation(&self) -> Option<Violation> {
        match self {
            RolegenError::MalformedDefinition { definition, reason } => Some(Violation::new(
                definition.clone(),
                ViolationKind::MalformedDefinition,
                reason.clone(),
            )),
            _ => None,
        }
    }
}

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, RolegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = RolegenError::malformed(DefinitionRef::new("foo", 3), "namespaces must not be empty");
        assert_eq!(
            err.to_string(),
            "Malformed definition foo#3: namespaces must not be empty"
        );
    }

    #[test]
    fn test_as_violation() {
        let err = RolegenError::malformed(DefinitionRef::new("foo", 0), "name is empty");
        let violation = err.as_violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::MalformedDefinition);
        assert_eq!(violation.definition_ref.position, 0);

        assert!(RolegenError::UnvalidatedGraph(2).as_violation().is_none());
    }
}
