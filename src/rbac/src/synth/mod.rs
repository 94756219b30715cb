//! Manifest synthesis
//!
//! Emits the concrete RBAC objects for a validated reference graph:
//! - a Role and RoleBinding per (cluster, namespace) of every definition
//! - one impersonation ClusterRole and ClusterRoleBinding per owned name,
//!   however many definitions reuse it

pub mod manifest;

pub use manifest::{GeneratedManifest, GeneratedManifestSet, RbacObject};

use crate::definition::{RoleDefinition, TemplateCatalog};
use crate::error::{Result, RolegenError};
use crate::graph::{DefinitionId, ReferenceGraph};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Label carrying the tool that manages the object
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Label carrying the role name the object was generated for
pub const ROLE_LABEL: &str = "rolegen.io/role";

/// Prefix of every generated impersonation ClusterRole
pub const IMPERSONATE_PREFIX: &str = "impersonate";

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

/// Synthesizer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizerConfig {
    /// ClusterRoleBinding name prefix (`auth-<name>`); identity provider specific
    pub binding_prefix: String,

    /// Value of the managed-by label
    pub managed_by: String,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            binding_prefix: "auth".to_string(),
            managed_by: "rolegen".to_string(),
        }
    }
}

impl SynthesizerConfig {
    /// Reject settings that would produce invalid object names
    pub fn validate(&self) -> Result<()> {
        let prefix = self.binding_prefix.as_str();
        if prefix.is_empty() {
            return Err(RolegenError::InvalidConfig(
                "binding prefix cannot be empty".to_string(),
            ));
        }
        // Names are only length-checked against the impersonation prefix
        if prefix.len() > IMPERSONATE_PREFIX.len() {
            return Err(RolegenError::InvalidConfig(format!(
                "binding prefix '{}' is longer than {} characters",
                prefix,
                IMPERSONATE_PREFIX.len()
            )));
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(RolegenError::InvalidConfig(format!(
                "binding prefix '{}' must be lowercase alphanumerics and '-'",
                prefix
            )));
        }
        if self.managed_by.trim().is_empty() {
            return Err(RolegenError::InvalidConfig(
                "managed-by label value cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Turns a validated reference graph into RBAC manifests
#[derive(Debug, Clone)]
pub struct ManifestSynthesizer<'a> {
    catalog: &'a TemplateCatalog,
    config: SynthesizerConfig,
}

impl<'a> ManifestSynthesizer<'a> {
    pub fn new(catalog: &'a TemplateCatalog) -> Self {
        Self::with_config(catalog, SynthesizerConfig::default())
    }

    pub fn with_config(catalog: &'a TemplateCatalog, config: SynthesizerConfig) -> Self {
        Self { catalog, config }
    }

    /// Synthesize every object for the graph
    ///
    /// # Errors
    ///
    /// Returns an error if the graph still has duplicate owners or unresolved
    /// reuse edges, or a definition references a template the catalog lacks.
    pub fn synthesize(&self, graph: &ReferenceGraph) -> Result<GeneratedManifestSet> {
        if !graph.is_consistent() {
            return Err(RolegenError::UnvalidatedGraph(
                graph.unresolved().len() + graph.duplicate_owners().len(),
            ));
        }

        let mut manifests = Vec::new();

        for definition in graph.definitions() {
            self.namespaced_objects(definition, &mut manifests)?;
        }

        for (name, owner) in graph.ownership().iter() {
            let clusters = self.cluster_role_targets(graph, owner);
            self.cluster_objects(name, clusters, &mut manifests);
        }

        let set = GeneratedManifestSet::new(manifests);
        debug!(
            objects = set.len(),
            cluster_roles = set.count_kind(ClusterRole::KIND),
            role_bindings = set.count_kind(RoleBinding::KIND),
            "synthesized manifests"
        );
        Ok(set)
    }

    /// Role + RoleBinding for each (cluster, namespace) of one definition
    fn namespaced_objects(
        &self,
        definition: &RoleDefinition,
        out: &mut Vec<GeneratedManifest>,
    ) -> Result<()> {
        let template = self
            .catalog
            .get(&definition.namespace_role_template)
            .ok_or_else(|| RolegenError::UnknownTemplate {
                definition: definition.definition_ref(),
                template: definition.namespace_role_template.clone(),
            })?;

        let rules: Vec<PolicyRule> = template
            .rules
            .iter()
            .chain(&definition.extra_namespace_rules)
            .map(|rule| rule.to_policy_rule())
            .collect();

        for (cluster, namespace) in definition.scopes() {
            let metadata = self.metadata(&definition.name, &definition.name, Some(namespace));

            let role = Role {
                metadata: metadata.clone(),
                rules: Some(rules.clone()),
                ..Default::default()
            };
            let binding = RoleBinding {
                metadata,
                role_ref: RoleRef {
                    api_group: RBAC_GROUP.to_string(),
                    kind: Role::KIND.to_string(),
                    name: definition.name.clone(),
                },
                subjects: Some(vec![group_subject(&definition.name)]),
                ..Default::default()
            };

            for object in [RbacObject::Role(role), RbacObject::RoleBinding(binding)] {
                out.push(GeneratedManifest {
                    role: definition.name.clone(),
                    clusters: vec![cluster.to_string()],
                    namespace: Some(namespace.to_string()),
                    object,
                });
            }
        }
        Ok(())
    }

    /// Sorted union of the owner's clusters and those of every reuser
    fn cluster_role_targets(&self, graph: &ReferenceGraph, owner: DefinitionId) -> Vec<String> {
        let mut clusters: BTreeSet<&str> = BTreeSet::new();
        for id in std::iter::once(owner).chain(graph.reusers_of(owner)) {
            if let Some(definition) = graph.definition(id) {
                clusters.extend(definition.clusters.iter().map(String::as_str));
            }
        }
        clusters.into_iter().map(str::to_string).collect()
    }

    /// Impersonation ClusterRole + ClusterRoleBinding for one owned name
    fn cluster_objects(&self, name: &str, clusters: Vec<String>, out: &mut Vec<GeneratedManifest>) {
        let cluster_role_name = format!("{}-{}", IMPERSONATE_PREFIX, name);
        let binding_name = format!("{}-{}", self.config.binding_prefix, name);

        let cluster_role = ClusterRole {
            metadata: self.metadata(&cluster_role_name, name, None),
            rules: Some(vec![PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["users".to_string(), "groups".to_string()]),
                verbs: vec!["impersonate".to_string()],
                ..Default::default()
            }]),
            ..Default::default()
        };
        let binding = ClusterRoleBinding {
            metadata: self.metadata(&binding_name, name, None),
            role_ref: RoleRef {
                api_group: RBAC_GROUP.to_string(),
                kind: ClusterRole::KIND.to_string(),
                name: cluster_role_name,
            },
            subjects: Some(vec![group_subject(name)]),
            ..Default::default()
        };

        for object in [
            RbacObject::ClusterRole(cluster_role),
            RbacObject::ClusterRoleBinding(binding),
        ] {
            out.push(GeneratedManifest {
                role: name.to_string(),
                clusters: clusters.clone(),
                namespace: None,
                object,
            });
        }
    }

    fn metadata(&self, object_name: &str, role: &str, namespace: Option<&str>) -> ObjectMeta {
        let labels = BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), self.config.managed_by.clone()),
            (ROLE_LABEL.to_string(), role.to_string()),
        ]);
        ObjectMeta {
            name: Some(object_name.to_string()),
            namespace: namespace.map(str::to_string),
            labels: Some(labels),
            ..Default::default()
        }
    }
}

/// The identity-provider group `<name>`, exactly as passed to `--as-group`
fn group_subject(name: &str) -> Subject {
    Subject {
        api_group: Some(RBAC_GROUP.to_string()),
        kind: "Group".to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}
