//! Reference graph module
//!
//! Resolves ClusterRole reuse between role definitions and validates the
//! result.
//!
//! # Features
//!
//! - **Name-keyed ownership**: reuse resolves through a lookup table, never by
//!   searching backwards from a definition's position
//! - **Exhaustive validation**: every duplicate owner, unresolved reuse and
//!   scope collision is reported in one pass
//! - **Compatibility warnings**: reusing a ClusterRole across templates is
//!   flagged without failing the run
//!
//! # Example
//!
//! ```ignore
//! use rolegen_rbac::graph::{GraphValidator, ReferenceGraphBuilder};
//!
//! let graph = ReferenceGraphBuilder::with_definitions(definitions).build();
//! let result = GraphValidator::new().validate(&graph);
//!
//! for error in &result.errors {
//!     eprintln!("{}", error);
//! }
//! ```

pub mod builder;
pub mod validator;


pub use builder::{
    ClusterRoleOwnership, DefinitionId, DuplicateOwner, ReferenceGraph, ReferenceGraphBuilder,
    ReuseEdge,
};
pub use validator::{GraphValidator, ValidationResult, Violation, ViolationKind};
