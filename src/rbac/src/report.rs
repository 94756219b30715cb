//! Generation report: the handoff to CLI/CI callers and manifest writers

use crate::graph::{ReferenceGraph, ValidationResult};
use crate::synth::GeneratedManifestSet;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::Resource;
use serde::Serialize;

/// Headline numbers for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub definitions: usize,
    pub owned_cluster_roles: usize,
    pub reuse_edges: usize,
    pub errors: usize,
    pub warnings: usize,
    pub cluster_roles: usize,
    pub cluster_role_bindings: usize,
    pub roles: usize,
    pub role_bindings: usize,
}

/// Outcome of one generation run
///
/// `manifests` is `None` whenever validation produced errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub summary: ReportSummary,
    pub validation: ValidationResult,
    pub manifests: Option<GeneratedManifestSet>,
}

impl GenerationReport {
    /// Report for a run that got as far as building the reference graph
    pub fn new(
        graph: &ReferenceGraph,
        validation: ValidationResult,
        manifests: Option<GeneratedManifestSet>,
    ) -> Self {
        let mut summary = ReportSummary {
            definitions: graph.definitions().len(),
            owned_cluster_roles: graph.ownership().len(),
            reuse_edges: graph.edges().len(),
            ..Default::default()
        };
        Self::fill_counts(&mut summary, &validation, manifests.as_ref());
        Self {
            summary,
            validation,
            manifests,
        }
    }

    /// Report for a run aborted before a graph existed
    pub fn aborted(validation: ValidationResult) -> Self {
        let mut summary = ReportSummary::default();
        Self::fill_counts(&mut summary, &validation, None);
        Self {
            summary,
            validation,
            manifests: None,
        }
    }

    fn fill_counts(
        summary: &mut ReportSummary,
        validation: &ValidationResult,
        manifests: Option<&GeneratedManifestSet>,
    ) {
        summary.errors = validation.errors.len();
        summary.warnings = validation.warnings.len();
        if let Some(set) = manifests {
            summary.cluster_roles = set.count_kind(ClusterRole::KIND);
            summary.cluster_role_bindings = set.count_kind(ClusterRoleBinding::KIND);
            summary.roles = set.count_kind(Role::KIND);
            summary.role_bindings = set.count_kind(RoleBinding::KIND);
        }
    }

    pub fn is_success(&self) -> bool {
        self.validation.valid && self.manifests.is_some()
    }

    /// Serialize for CI consumption
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
