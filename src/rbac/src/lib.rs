//! # rolegen RBAC engine
//!
//! Dependency-aware generation of Kubernetes RBAC manifests from declarative
//! role definitions.
//!
//! ## Features
//!
//! - **Explicit ClusterRole reuse**: definitions either own an impersonation
//!   ClusterRole or reuse one owned by a definition of the same name, resolved
//!   through a name-keyed ownership table
//! - **Exhaustive validation**: duplicate owners, unresolved reuse and scope
//!   collisions are all reported in one run
//! - **Deterministic output**: the manifest set is canonically ordered and
//!   renders to byte-identical YAML for the same input
//!
//! ## Example
//!
//! ```rust
//! use rolegen_core::RawDefinition;
//! use rolegen_rbac::{Generator, TemplateCatalog};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Generator::new(TemplateCatalog::builtin())?;
//!
//! let records = vec![
//!     RawDefinition::new("foo", "oncall")
//!         .with_namespaces(&["payments"])
//!         .with_clusters(&["prod-eu"]),
//!     RawDefinition::new("foo", "oncall")
//!         .with_namespaces(&["ledger"])
//!         .with_clusters(&["prod-eu"])
//!         .reusing(),
//! ];
//!
//! let report = generator.generate(&records)?;
//! assert!(report.is_success());
//!
//! let manifests = report.manifests.as_ref().unwrap();
//! assert_eq!(manifests.count_kind("ClusterRole"), 1);
//! assert_eq!(manifests.count_kind("RoleBinding"), 2);
//! # Ok(())
//! # }
//! ```

pub mod definition;
pub mod engine;
pub mod error;
pub mod graph;
pub mod report;
pub mod sink;
pub mod synth;

// Re-export commonly used types
pub use definition::{
    ClusterRoleMode, DefinitionNormalizer, DefinitionRef, PermissionRule, PermissionTemplate,
    RoleDefinition, TemplateCatalog,
};
pub use engine::Generator;
pub use error::{Result, RolegenError};
pub use graph::{
    ClusterRoleOwnership, GraphValidator, ReferenceGraph, ReferenceGraphBuilder, ValidationResult,
    Violation, ViolationKind,
};
pub use report::{GenerationReport, ReportSummary};
pub use sink::ManifestSink;
pub use synth::{
    GeneratedManifest, GeneratedManifestSet, ManifestSynthesizer, RbacObject, SynthesizerConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
