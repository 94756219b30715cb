//! Definition model
//!
//! Typed, validated role definitions and the permission template catalog
//! they are resolved against.

pub mod normalize;
pub mod template;
pub mod types;

pub use normalize::{DefinitionNormalizer, MAX_NAME_LEN};
pub use template::{PermissionTemplate, TemplateCatalog};
pub use types::{ClusterRoleMode, DefinitionRef, PermissionRule, RoleDefinition};
