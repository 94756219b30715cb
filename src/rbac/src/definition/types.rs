//! Role definition type definitions

use k8s_openapi::api::rbac::v1::PolicyRule;
use rolegen_core::RawRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a definition generates its own impersonation ClusterRole
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRoleMode {
    /// Generates `impersonate-<name>` and its binding
    #[default]
    Owns,
    /// Binds through the ClusterRole owned by another definition of the same name
    Reuses,
}

impl FromStr for ClusterRoleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owns" => Ok(ClusterRoleMode::Owns),
            "reuses" => Ok(ClusterRoleMode::Reuses),
            other => Err(format!(
                "unknown clusterRoleMode '{}' (expected 'owns' or 'reuses')",
                other
            )),
        }
    }
}

impl fmt::Display for ClusterRoleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterRoleMode::Owns => f.write_str("owns"),
            ClusterRoleMode::Reuses => f.write_str("reuses"),
        }
    }
}

/// Identity of a definition in diagnostics: its name and authoring position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionRef {
    pub name: String,
    pub position: usize,
}

impl DefinitionRef {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

impl fmt::Display for DefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<unnamed>#{}", self.position)
        } else {
            write!(f, "{}#{}", self.name, self.position)
        }
    }
}

/// A single permission rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// API groups; `""` is the core group
    #[serde(default)]
    pub api_groups: Vec<String>,

    pub resources: Vec<String>,

    pub verbs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,
}

impl PermissionRule {
    /// Create a new rule
    pub fn new(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> Self {
        Self {
            api_groups: api_groups.iter().map(ToString::to_string).collect(),
            resources: resources.iter().map(ToString::to_string).collect(),
            verbs: verbs.iter().map(ToString::to_string).collect(),
            resource_names: Vec::new(),
        }
    }

    /// Check the rule grants something concrete
    pub fn validate(&self) -> Result<(), String> {
        if self.resources.is_empty() {
            return Err("rule must name at least one resource".to_string());
        }
        if self.verbs.is_empty() {
            return Err("rule must grant at least one verb".to_string());
        }
        if self.resources.iter().chain(&self.verbs).any(|s| s.trim().is_empty()) {
            return Err("rule contains an empty resource or verb".to_string());
        }
        Ok(())
    }

    /// Convert into the Kubernetes rule representation
    pub fn to_policy_rule(&self) -> PolicyRule {
        PolicyRule {
            api_groups: Some(self.api_groups.clone()),
            resources: Some(self.resources.clone()),
            verbs: self.verbs.clone(),
            resource_names: if self.resource_names.is_empty() {
                None
            } else {
                Some(self.resource_names.clone())
            },
            ..Default::default()
        }
    }
}

impl From<RawRule> for PermissionRule {
    fn from(raw: RawRule) -> Self {
        Self {
            api_groups: raw.api_groups,
            resources: raw.resources,
            verbs: raw.verbs,
            resource_names: raw.resource_names,
        }
    }
}

/// Normalized role definition
///
/// Built once per run by the normalizer and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    /// Role name; shared by definitions extending one logical role
    pub name: String,

    /// Permission template applied in every namespace
    pub namespace_role_template: String,

    pub namespaces: Vec<String>,

    /// Cluster-group identifiers
    pub clusters: Vec<String>,

    pub cluster_role_mode: ClusterRoleMode,

    pub extra_namespace_rules: Vec<PermissionRule>,

    /// Authoring position; diagnostics and tie-breaking only
    pub sequence_index: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RoleDefinition {
    pub fn definition_ref(&self) -> DefinitionRef {
        DefinitionRef::new(self.name.clone(), self.sequence_index)
    }

    pub fn owns_cluster_role(&self) -> bool {
        self.cluster_role_mode == ClusterRoleMode::Owns
    }

    /// Every (cluster, namespace) pair this definition applies to
    pub fn scopes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.clusters.iter().flat_map(move |cluster| {
            self.namespaces
                .iter()
                .map(move |namespace| (cluster.as_str(), namespace.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(mode: ClusterRoleMode) -> RoleDefinition {
        RoleDefinition {
            name: "search-oncall".to_string(),
            namespace_role_template: "oncall".to_string(),
            namespaces: vec!["search".to_string(), "indexer".to_string()],
            clusters: vec!["prod-eu".to_string(), "prod-us".to_string()],
            cluster_role_mode: mode,
            extra_namespace_rules: Vec::new(),
            sequence_index: 4,
            source: None,
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("owns".parse::<ClusterRoleMode>(), Ok(ClusterRoleMode::Owns));
        assert_eq!(" Reuses ".parse::<ClusterRoleMode>(), Ok(ClusterRoleMode::Reuses));
        assert!("share".parse::<ClusterRoleMode>().is_err());
        assert_eq!(ClusterRoleMode::default(), ClusterRoleMode::Owns);
    }

    #[test]
    fn test_scopes_cross_product() {
        let def = definition(ClusterRoleMode::Owns);
        let scopes: Vec<_> = def.scopes().collect();

        assert_eq!(
            scopes,
            vec![
                ("prod-eu", "search"),
                ("prod-eu", "indexer"),
                ("prod-us", "search"),
                ("prod-us", "indexer"),
            ]
        );
    }

    #[test]
    fn test_definition_ref() {
        let def = definition(ClusterRoleMode::Reuses);
        assert_eq!(def.definition_ref().to_string(), "search-oncall#4");
        assert!(!def.owns_cluster_role());
        assert_eq!(DefinitionRef::new("", 2).to_string(), "<unnamed>#2");
    }

    #[test]
    fn test_rule_validation() {
        assert!(PermissionRule::new(&[""], &["pods"], &["get"]).validate().is_ok());
        assert!(PermissionRule::new(&[""], &[], &["get"]).validate().is_err());
        assert!(PermissionRule::new(&[""], &["pods"], &[]).validate().is_err());
        assert!(PermissionRule::new(&[""], &["pods"], &[" "]).validate().is_err());
    }

    #[test]
    fn test_to_policy_rule() {
        let mut rule = PermissionRule::new(&["apps"], &["deployments"], &["patch"]);
        let policy = rule.to_policy_rule();
        assert_eq!(policy.api_groups, Some(vec!["apps".to_string()]));
        assert!(policy.resource_names.is_none());

        rule.resource_names = vec!["api".to_string()];
        assert_eq!(
            rule.to_policy_rule().resource_names,
            Some(vec!["api".to_string()])
        );
    }
}
