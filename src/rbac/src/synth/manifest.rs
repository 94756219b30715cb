//! Generated manifest types

use crate::error::Result;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource;
use serde::Serialize;
use std::collections::BTreeSet;

/// One generated RBAC object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RbacObject {
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Role(Role),
    RoleBinding(RoleBinding),
}

impl RbacObject {
    pub fn kind(&self) -> &'static str {
        match self {
            RbacObject::ClusterRole(_) => ClusterRole::KIND,
            RbacObject::ClusterRoleBinding(_) => ClusterRoleBinding::KIND,
            RbacObject::Role(_) => Role::KIND,
            RbacObject::RoleBinding(_) => RoleBinding::KIND,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            RbacObject::ClusterRole(o) => &o.metadata,
            RbacObject::ClusterRoleBinding(o) => &o.metadata,
            RbacObject::Role(o) => &o.metadata,
            RbacObject::RoleBinding(o) => &o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, RbacObject::ClusterRole(_) | RbacObject::ClusterRoleBinding(_))
    }

    /// Position of the kind in output order: roles before their bindings
    fn kind_rank(&self) -> u8 {
        match self {
            RbacObject::ClusterRole(_) => 0,
            RbacObject::ClusterRoleBinding(_) => 1,
            RbacObject::Role(_) => 2,
            RbacObject::RoleBinding(_) => 3,
        }
    }
}

/// A generated object and where it is applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedManifest {
    /// Role name the object was generated for
    pub role: String,

    /// Target clusters; exactly one for namespaced objects
    pub clusters: Vec<String>,

    /// Namespace for Role/RoleBinding, `None` for cluster-scoped objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub object: RbacObject,
}

impl GeneratedManifest {
    pub fn targets(&self, cluster: &str) -> bool {
        self.clusters.iter().any(|c| c == cluster)
    }

    /// Canonical ordering key: cluster-scoped first, then cluster, namespace, kind, name
    fn sort_key(&self) -> (bool, &[String], Option<&str>, u8, &str) {
        (
            !self.object.is_cluster_scoped(),
            self.clusters.as_slice(),
            self.namespace.as_deref(),
            self.object.kind_rank(),
            self.object.name(),
        )
    }

    /// YAML document for the object alone
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.object)?)
    }
}

/// Ordered, immutable output of one generation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GeneratedManifestSet {
    manifests: Vec<GeneratedManifest>,
}

impl GeneratedManifestSet {
    /// Build a set; the order of `manifests` is irrelevant
    pub fn new(mut manifests: Vec<GeneratedManifest>) -> Self {
        manifests.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { manifests }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedManifest> {
        self.manifests.iter()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Number of objects of a kind (`"Role"`, `"ClusterRole"`, ...)
    pub fn count_kind(&self, kind: &str) -> usize {
        self.manifests.iter().filter(|m| m.object.kind() == kind).count()
    }

    /// Every cluster targeted by at least one object
    pub fn clusters(&self) -> BTreeSet<&str> {
        self.manifests
            .iter()
            .flat_map(|m| m.clusters.iter().map(String::as_str))
            .collect()
    }

    /// Objects to apply on one cluster
    pub fn for_cluster<'a>(&'a self, cluster: &'a str) -> impl Iterator<Item = &'a GeneratedManifest> + 'a {
        self.manifests.iter().filter(move |m| m.targets(cluster))
    }

    /// Narrow the set to the given clusters
    ///
    /// Objects outside them are dropped and the cluster lists of the rest are
    /// cut down to the requested ones.
    pub fn restrict_to(&self, clusters: &[String]) -> Self {
        let manifests = self
            .manifests
            .iter()
            .filter_map(|m| {
                let kept: Vec<String> = m
                    .clusters
                    .iter()
                    .filter(|c| clusters.contains(c))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    return None;
                }
                Some(GeneratedManifest {
                    clusters: kept,
                    ..m.clone()
                })
            })
            .collect();
        Self::new(manifests)
    }

    /// Requested clusters that no object in the set targets
    pub fn unknown_clusters<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        let known = self.clusters();
        requested
            .iter()
            .map(String::as_str)
            .filter(|cluster| !known.contains(cluster))
            .collect()
    }

    /// Render the whole set as one multi-document YAML stream
    pub fn render_yaml(&self) -> Result<String> {
        render(self.manifests.iter())
    }

    /// Render only the objects for one cluster
    pub fn render_cluster_yaml(&self, cluster: &str) -> Result<String> {
        render(self.for_cluster(cluster))
    }
}

fn render<'a>(manifests: impl Iterator<Item = &'a GeneratedManifest>) -> Result<String> {
    let mut out = String::new();
    for manifest in manifests {
        out.push_str("---\n");
        out.push_str(&manifest.to_yaml()?);
    }
    Ok(out)
}

impl<'a> IntoIterator for &'a GeneratedManifestSet {
    type Item = &'a GeneratedManifest;
    type IntoIter = std::slice::Iter<'a, GeneratedManifest>;

    fn into_iter(self) -> Self::IntoIter {
        self.manifests.iter()
    }
}
