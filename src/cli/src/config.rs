//! Generator configuration loading and validation

use anyhow::{Context, Result};
use rolegen_rbac::{PermissionTemplate, SynthesizerConfig, TemplateCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete generator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RolegenConfig {
    #[serde(default)]
    pub generator: GeneratorSection,

    #[serde(default)]
    pub paths: PathsSection,

    /// Namespace permission templates; the built-in ones apply when empty
    #[serde(default)]
    pub templates: BTreeMap<String, PermissionTemplate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorSection {
    #[serde(default = "default_binding_prefix")]
    pub binding_prefix: String,
    #[serde(default = "default_managed_by")]
    pub managed_by: String,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            binding_prefix: default_binding_prefix(),
            managed_by: default_managed_by(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsSection {
    #[serde(default = "default_definitions")]
    pub definitions: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            definitions: default_definitions(),
            output: default_output(),
        }
    }
}

// Default value functions
fn default_binding_prefix() -> String { "auth".to_string() }
fn default_managed_by() -> String { "rolegen".to_string() }
fn default_definitions() -> PathBuf { PathBuf::from("roles") }
fn default_output() -> PathBuf { PathBuf::from("manifests") }

impl RolegenConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: RolegenConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.synthesizer_config()
            .validate()
            .context("Invalid [generator] section")?;

        for (name, template) in &self.templates {
            if template.rules.is_empty() {
                anyhow::bail!("Template '{}' must define at least one rule", name);
            }
        }

        self.catalog()
            .validate()
            .context("Invalid [templates] section")?;

        Ok(())
    }

    /// Template catalog for a run
    pub fn catalog(&self) -> TemplateCatalog {
        if self.templates.is_empty() {
            return TemplateCatalog::builtin();
        }
        self.templates
            .iter()
            .map(|(name, template)| (name.clone(), template.clone()))
            .collect()
    }

    pub fn synthesizer_config(&self) -> SynthesizerConfig {
        SynthesizerConfig {
            binding_prefix: self.generator.binding_prefix.clone(),
            managed_by: self.generator.managed_by.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[generator]
binding_prefix = "sso"

[paths]
definitions = "access/roles"

[templates.debug]
description = "Log access only"

[[templates.debug.rules]]
api_groups = [""]
resources = ["pods", "pods/log"]
verbs = ["get", "list"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = RolegenConfig::parse(SAMPLE).unwrap();

        assert_eq!(config.generator.binding_prefix, "sso");
        assert_eq!(config.generator.managed_by, "rolegen");
        assert_eq!(config.paths.definitions, PathBuf::from("access/roles"));
        assert_eq!(config.paths.output, PathBuf::from("manifests"));
        assert!(config.validate().is_ok());

        let catalog = config.catalog();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["debug"]);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = RolegenConfig::parse("").unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.synthesizer_config(), SynthesizerConfig::default());
        assert!(config.catalog().contains("oncall"));
        assert!(config.catalog().contains("readonly"));
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let config = RolegenConfig::parse("[generator]\nbinding_prefix = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_template_without_rules() {
        let config = RolegenConfig::parse("[templates.empty]\nrules = []\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_rejects_rule_without_verbs() {
        let toml = r#"
[[templates.broken.rules]]
resources = ["pods"]
verbs = []
"#;
        let config = RolegenConfig::parse(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rolegen.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = RolegenConfig::load(&path).unwrap();
        assert_eq!(config.generator.binding_prefix, "sso");

        let missing = RolegenConfig::load(dir.path().join("missing.toml"));
        assert!(missing.is_err());
    }
}
