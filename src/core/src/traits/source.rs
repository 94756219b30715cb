//! Input collaborator

use crate::error::Result;
use crate::types::RawDefinition;

/// Produces the ordered collection of raw definition records for one run
///
/// The order returned is the authoring order; it is kept for diagnostics
/// only and never decides how ClusterRole reuse is resolved.
pub trait DefinitionSource: Send + Sync {
    /// Load every record
    fn load(&self) -> Result<Vec<RawDefinition>>;
}

/// In-memory records are a source of themselves
impl DefinitionSource for Vec<RawDefinition> {
    fn load(&self) -> Result<Vec<RawDefinition>> {
        Ok(self.clone())
    }
}
