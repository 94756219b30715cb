//! rolegen command-line front end
//!
//! Wires the YAML definition loader, the TOML configuration and the
//! manifest writers around the `rolegen-rbac` generation engine.

pub mod config;
pub mod diagnostics;
pub mod loader;
pub mod writer;

pub use config::RolegenConfig;
pub use loader::YamlDefinitionSource;
pub use writer::{DirectorySink, StdoutSink};
