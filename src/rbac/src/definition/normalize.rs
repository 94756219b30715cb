//! Raw record normalization
//!
//! Turns loader records into `RoleDefinition` values. Any record that cannot
//! be normalized unambiguously aborts the run with `MalformedDefinition`:
//! a reference graph built over half-understood nodes would be meaningless.

use super::template::TemplateCatalog;
use super::types::{ClusterRoleMode, DefinitionRef, PermissionRule, RoleDefinition};
use crate::error::{Result, RolegenError};
use regex::Regex;
use rolegen_core::RawDefinition;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// Longest generated prefix is `impersonate-`
pub const MAX_NAME_LEN: usize = 253 - "impersonate-".len();

const MAX_NAMESPACE_LEN: usize = 63;

static SUBDOMAIN: OnceLock<Regex> = OnceLock::new();
static LABEL: OnceLock<Regex> = OnceLock::new();

fn subdomain_pattern() -> &'static Regex {
    SUBDOMAIN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .expect("static pattern")
    })
}

fn label_pattern() -> &'static Regex {
    LABEL.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static pattern"))
}

/// Normalizes raw records against an injected template catalog
#[derive(Debug, Clone, Copy)]
pub struct DefinitionNormalizer<'a> {
    catalog: &'a TemplateCatalog,
}

impl<'a> DefinitionNormalizer<'a> {
    pub fn new(catalog: &'a TemplateCatalog) -> Self {
        Self { catalog }
    }

    /// Normalize a whole collection, stopping at the first malformed record
    pub fn normalize_all(&self, records: &[RawDefinition]) -> Result<Vec<RoleDefinition>> {
        let definitions = records
            .iter()
            .enumerate()
            .map(|(position, raw)| self.normalize(position, raw))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = definitions.len(), "normalized role definitions");
        Ok(definitions)
    }

    /// Normalize one record found at `position` in authoring order
    pub fn normalize(&self, position: usize, raw: &RawDefinition) -> Result<RoleDefinition> {
        let name = raw.name.trim();
        let malformed = |reason: String| {
            let reason = match &raw.source {
                Some(source) => format!("{} (in {})", reason, source),
                None => reason,
            };
            RolegenError::malformed(DefinitionRef::new(name, position), reason)
        };

        validate_name(name).map_err(&malformed)?;

        let template = raw.namespace_role_template.trim();
        if template.is_empty() {
            return Err(malformed("namespaceRoleTemplate must be set".to_string()));
        }
        if !self.catalog.contains(template) {
            return Err(malformed(format!(
                "unknown namespaceRoleTemplate '{}' (known: {})",
                template,
                self.catalog.names().collect::<Vec<_>>().join(", ")
            )));
        }

        let namespaces = normalize_list("namespaces", &raw.namespaces).map_err(&malformed)?;
        for namespace in &namespaces {
            validate_namespace(namespace).map_err(&malformed)?;
        }
        let clusters = normalize_list("clusters", &raw.clusters).map_err(&malformed)?;
        for cluster in &clusters {
            validate_cluster(cluster).map_err(&malformed)?;
        }

        let cluster_role_mode = resolve_mode(raw).map_err(&malformed)?;

        let mut extra_namespace_rules = Vec::with_capacity(raw.extra_namespace_rules.len());
        for (index, rule) in raw.extra_namespace_rules.iter().enumerate() {
            let rule = PermissionRule::from(rule.clone());
            rule.validate()
                .map_err(|reason| malformed(format!("extraNamespaceRules[{}]: {}", index, reason)))?;
            extra_namespace_rules.push(rule);
        }

        Ok(RoleDefinition {
            name: name.to_string(),
            namespace_role_template: template.to_string(),
            namespaces,
            clusters,
            cluster_role_mode,
            extra_namespace_rules,
            sequence_index: position,
            source: raw.source.clone(),
        })
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("name is longer than {} characters", MAX_NAME_LEN));
    }
    if !subdomain_pattern().is_match(name) {
        return Err(format!(
            "name '{}' is not a valid object name (lowercase alphanumerics, '-' and '.')",
            name
        ));
    }
    Ok(())
}

fn validate_namespace(namespace: &str) -> std::result::Result<(), String> {
    if namespace.len() > MAX_NAMESPACE_LEN || !label_pattern().is_match(namespace) {
        return Err(format!("namespace '{}' is not a valid DNS-1123 label", namespace));
    }
    Ok(())
}

/// Cluster ids name output directories, so they get the same rules as namespaces
fn validate_cluster(cluster: &str) -> std::result::Result<(), String> {
    if cluster.len() > MAX_NAMESPACE_LEN || !label_pattern().is_match(cluster) {
        return Err(format!("cluster '{}' is not a valid DNS-1123 label", cluster));
    }
    Ok(())
}

/// Trim entries and reject empty lists, blank entries and repeats
fn normalize_list(field: &str, values: &[String]) -> std::result::Result<Vec<String>, String> {
    if values.is_empty() {
        return Err(format!("{} must not be empty", field));
    }

    let mut seen = HashSet::with_capacity(values.len());
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("{} contains an empty entry", field));
        }
        if !seen.insert(value) {
            return Err(format!("{} lists '{}' more than once", field, value));
        }
        out.push(value.to_string());
    }
    Ok(out)
}

/// The explicit mode and the legacy flag may both be present only if they agree
fn resolve_mode(raw: &RawDefinition) -> std::result::Result<ClusterRoleMode, String> {
    let explicit = raw
        .cluster_role_mode
        .as_deref()
        .map(str::parse::<ClusterRoleMode>)
        .transpose()?;
    let legacy = raw.reuse_cluster_role.map(|reuse| {
        if reuse {
            ClusterRoleMode::Reuses
        } else {
            ClusterRoleMode::Owns
        }
    });

    match (explicit, legacy) {
        (Some(mode), Some(flag)) if mode != flag => Err(format!(
            "clusterRoleMode '{}' contradicts reuseClusterRole: {}",
            mode,
            flag == ClusterRoleMode::Reuses
        )),
        (Some(mode), _) | (None, Some(mode)) => Ok(mode),
        (None, None) => Ok(ClusterRoleMode::Owns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegen_core::RawRule;

    fn raw(name: &str) -> RawDefinition {
        RawDefinition::new(name, "oncall")
            .with_namespaces(&["payments"])
            .with_clusters(&["prod-eu"])
    }

    fn normalize(raw: &RawDefinition) -> Result<RoleDefinition> {
        let catalog = TemplateCatalog::builtin();
        DefinitionNormalizer::new(&catalog).normalize(7, raw)
    }

    fn reason(result: Result<RoleDefinition>) -> String {
        match result {
            Err(RolegenError::MalformedDefinition { reason, .. }) => reason,
            other => panic!("Expected MalformedDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_record() {
        let def = normalize(&raw(" payments-oncall ")).unwrap();

        assert_eq!(def.name, "payments-oncall");
        assert_eq!(def.sequence_index, 7);
        assert_eq!(def.cluster_role_mode, ClusterRoleMode::Owns);
    }

    #[test]
    fn test_empty_name() {
        assert!(reason(normalize(&raw(""))).contains("name must not be empty"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(reason(normalize(&raw("Payments_Oncall"))).contains("not a valid object name"));

        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(reason(normalize(&raw(&long))).contains("longer than"));
    }

    #[test]
    fn test_empty_scopes() {
        let record = raw("foo").with_namespaces(&[]);
        assert!(reason(normalize(&record)).contains("namespaces must not be empty"));

        let record = raw("foo").with_clusters(&[]);
        assert!(reason(normalize(&record)).contains("clusters must not be empty"));
    }

    #[test]
    fn test_duplicate_namespace() {
        let record = raw("foo").with_namespaces(&["a", "b", "a"]);
        assert!(reason(normalize(&record)).contains("'a' more than once"));
    }

    #[test]
    fn test_invalid_namespace() {
        let record = raw("foo").with_namespaces(&["Kube_System"]);
        assert!(reason(normalize(&record)).contains("DNS-1123"));
    }

    #[test]
    fn test_invalid_cluster() {
        for cluster in ["../escaped", "prod/eu", ".", "..", "Prod-EU", "prod eu"] {
            let record = raw("foo").with_clusters(&[cluster]);
            let reason = reason(normalize(&record));
            assert!(reason.contains("not a valid DNS-1123 label"), "{}: {}", cluster, reason);
        }
    }

    #[test]
    fn test_unknown_template() {
        let mut record = raw("foo");
        record.namespace_role_template = "superuser".to_string();

        let reason = reason(normalize(&record));
        assert!(reason.contains("unknown namespaceRoleTemplate 'superuser'"));
        assert!(reason.contains("oncall, readonly"));
    }

    #[test]
    fn test_mode_resolution() {
        let mut record = raw("foo");
        record.reuse_cluster_role = Some(true);
        assert_eq!(normalize(&record).unwrap().cluster_role_mode, ClusterRoleMode::Reuses);

        record.cluster_role_mode = Some("reuses".to_string());
        assert_eq!(normalize(&record).unwrap().cluster_role_mode, ClusterRoleMode::Reuses);

        record.reuse_cluster_role = Some(false);
        assert!(reason(normalize(&record)).contains("contradicts"));

        let mut record = raw("foo");
        record.cluster_role_mode = Some("borrow".to_string());
        assert!(reason(normalize(&record)).contains("unknown clusterRoleMode"));
    }

    #[test]
    fn test_invalid_extra_rule() {
        let record = raw("foo").with_rule(RawRule::new(&["batch"], &["jobs"], &[]));
        assert!(reason(normalize(&record)).contains("extraNamespaceRules[0]"));
    }

    #[test]
    fn test_source_in_reason() {
        let record = raw("foo").with_clusters(&[]).with_source("teams/payments.yaml");
        assert!(reason(normalize(&record)).contains("(in teams/payments.yaml)"));
    }

    #[test]
    fn test_normalize_all_stops_at_first() {
        let catalog = TemplateCatalog::builtin();
        let records = vec![raw("ok"), raw(""), raw("Bad_Name")];

        match DefinitionNormalizer::new(&catalog).normalize_all(&records) {
            Err(RolegenError::MalformedDefinition { definition, .. }) => {
                assert_eq!(definition.position, 1);
            }
            other => panic!("Expected MalformedDefinition, got {:?}", other),
        }
    }
}
