//! Permission template catalog
//!
//! Templates (e.g. `oncall`) carry the base namespace rules every definition
//! referencing them receives. The catalog is injected at run start and never
//! mutated during a run.

use super::types::PermissionRule;
use crate::error::{Result, RolegenError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named set of base namespace rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub rules: Vec<PermissionRule>,
}

impl PermissionTemplate {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self {
            description: None,
            rules,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Read-only mapping of template name to template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, PermissionTemplate>,
}

impl TemplateCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the stock `oncall` and `readonly` templates
    pub fn builtin() -> Self {
        let read = ["get", "list", "watch"];

        let oncall = PermissionTemplate::new(vec![
            PermissionRule::new(
                &[""],
                &["pods", "pods/log", "services", "endpoints", "configmaps", "events"],
                &read,
            ),
            PermissionRule::new(&[""], &["pods"], &["delete"]),
            PermissionRule::new(&[""], &["pods/exec", "pods/portforward"], &["create"]),
            PermissionRule::new(
                &["apps"],
                &["deployments", "statefulsets", "replicasets", "daemonsets"],
                &["get", "list", "watch", "patch"],
            ),
            PermissionRule::new(&["batch"], &["jobs", "cronjobs"], &read),
        ])
        .with_description("Incident response: inspect, restart and exec into workloads");

        let readonly = PermissionTemplate::new(vec![
            PermissionRule::new(
                &[""],
                &["pods", "pods/log", "services", "endpoints", "configmaps", "events"],
                &read,
            ),
            PermissionRule::new(
                &["apps"],
                &["deployments", "statefulsets", "replicasets", "daemonsets"],
                &read,
            ),
            PermissionRule::new(&["batch"], &["jobs", "cronjobs"], &read),
        ])
        .with_description("Read-only visibility into namespace workloads");

        Self::new()
            .with_template("oncall", oncall)
            .with_template("readonly", readonly)
    }

    /// Add a template, replacing any with the same name
    pub fn with_template(mut self, name: impl Into<String>, template: PermissionTemplate) -> Self {
        self.insert(name, template);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, template: PermissionTemplate) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&PermissionTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PermissionTemplate)> {
        self.templates.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Every template must carry at least one valid rule
    pub fn validate(&self) -> Result<()> {
        for (name, template) in &self.templates {
            if name.trim().is_empty() {
                return Err(RolegenError::InvalidConfig(
                    "template name cannot be empty".to_string(),
                ));
            }
            if template.rules.is_empty() {
                return Err(RolegenError::InvalidConfig(format!(
                    "template '{}' has no rules",
                    name
                )));
            }
            for rule in &template.rules {
                rule.validate().map_err(|reason| {
                    RolegenError::InvalidConfig(format!("template '{}': {}", name, reason))
                })?;
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, PermissionTemplate)> for TemplateCatalog {
    fn from_iter<I: IntoIterator<Item = (String, PermissionTemplate)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}
