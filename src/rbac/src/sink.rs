//! Output collaborator

use crate::error::Result;
use crate::synth::GeneratedManifestSet;

/// Persists or publishes a generated manifest set
///
/// The engine never knows about paths or deployment targets; a sink is only
/// ever handed the set of a successful run.
pub trait ManifestSink {
    /// Write the set, returning the number of objects written
    fn write(&self, manifests: &GeneratedManifestSet) -> Result<usize>;
}
