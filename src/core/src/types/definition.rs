//! Raw role definition records
//!
//! These mirror the authoring format one-to-one. Every field is optional at
//! this layer so that a missing value reaches the normalizer, which reports
//! it as a malformed definition with the record's identity attached.
//! Unknown keys are rejected: a misspelled mode key must not fall back to
//! the default mode.

use serde::{Deserialize, Serialize};

/// One permission rule as authored (`apiGroups`, `resources`, `verbs`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRule {
    /// API groups; `""` is the core group
    #[serde(default)]
    pub api_groups: Vec<String>,

    #[serde(default)]
    pub resources: Vec<String>,

    #[serde(default)]
    pub verbs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,
}

impl RawRule {
    /// Create a rule from string slices
    pub fn new(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> Self {
        Self {
            api_groups: api_groups.iter().map(ToString::to_string).collect(),
            resources: resources.iter().map(ToString::to_string).collect(),
            verbs: verbs.iter().map(ToString::to_string).collect(),
            resource_names: Vec::new(),
        }
    }
}

/// One role definition record before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawDefinition {
    /// Role name, also the identity-provider group string
    #[serde(default)]
    pub name: String,

    /// Name of the permission template applied in each namespace
    #[serde(default)]
    pub namespace_role_template: String,

    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Cluster-group identifiers
    #[serde(default)]
    pub clusters: Vec<String>,

    /// Explicit mode: `owns` or `reuses`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_role_mode: Option<String>,

    /// Legacy reuse flag; `true` means `reuses`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_cluster_role: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_namespace_rules: Vec<RawRule>,

    /// Where the record came from (file path), filled in by loaders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RawDefinition {
    /// Create a new record with a name and template
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace_role_template: template.into(),
            ..Default::default()
        }
    }

    /// Set the namespaces
    pub fn with_namespaces(mut self, namespaces: &[&str]) -> Self {
        self.namespaces = namespaces.iter().map(ToString::to_string).collect();
        self
    }

    /// Set the cluster groups
    pub fn with_clusters(mut self, clusters: &[&str]) -> Self {
        self.clusters = clusters.iter().map(ToString::to_string).collect();
        self
    }

    /// Mark the record as reusing the ClusterRole of its name's owner
    pub fn reusing(mut self) -> Self {
        self.cluster_role_mode = Some("reuses".to_string());
        self
    }

    /// Add an extra namespace rule
    pub fn with_rule(mut self, rule: RawRule) -> Self {
        self.extra_namespace_rules.push(rule);
        self
    }

    /// Record the origin of this definition
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
