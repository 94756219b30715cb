//! Reference graph validation
//!
//! Walks the whole graph and collects every violation instead of stopping at
//! the first one, so a single run surfaces all broken reuse edges.

use super::builder::{DefinitionId, ReferenceGraph};
use crate::definition::{DefinitionRef, RoleDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Kind of a reported problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Structurally invalid record (fail-fast, never collected)
    MalformedDefinition,
    /// Two `Owns` definitions share a name
    DuplicateOwnership,
    /// A `Reuses` definition has no owner
    UnresolvedReuse,
    /// Two definitions of one name target the same cluster and namespace
    ScopeCollision,
    /// Reused ClusterRole belongs to a definition with another template (warning)
    TemplateMismatch,
}

impl ViolationKind {
    /// Whether this kind fails the run
    pub fn is_error(&self) -> bool {
        !matches!(self, ViolationKind::TemplateMismatch)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::MalformedDefinition => "MalformedDefinition",
            ViolationKind::DuplicateOwnership => "DuplicateOwnership",
            ViolationKind::UnresolvedReuse => "UnresolvedReuse",
            ViolationKind::ScopeCollision => "ScopeCollision",
            ViolationKind::TemplateMismatch => "TemplateMismatch",
        };
        f.write_str(name)
    }
}

/// One reported problem, attributed to a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub definition_ref: DefinitionRef,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(definition_ref: DefinitionRef, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            definition_ref,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.definition_ref, self.kind, self.message)
    }
}

/// Outcome of validating one reference graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<Violation>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            violations.into_iter().partition(|v| v.kind.is_error());
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Result for a run aborted by a malformed record
    pub fn malformed(violation: Violation) -> Self {
        Self {
            valid: false,
            errors: vec![violation],
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors of one kind
    pub fn errors_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.errors.iter().filter(move |v| v.kind == kind)
    }

    /// Warnings of one kind
    pub fn warnings_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.warnings.iter().filter(move |v| v.kind == kind)
    }
}

/// Checks a reference graph for ownership and reuse violations
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphValidator;

impl GraphValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the graph, reporting every violation found
    ///
    /// Checks, in order:
    /// - no name has more than one `Owns` definition
    /// - every `Reuses` definition resolves to an owner
    /// - definitions sharing a name never target the same (cluster, namespace)
    /// - reusing definitions use the same template as their owner (warning)
    pub fn validate(&self, graph: &ReferenceGraph) -> ValidationResult {
        let mut violations = Vec::new();

        self.check_duplicate_owners(graph, &mut violations);
        self.check_unresolved(graph, &mut violations);
        self.check_scope_collisions(graph, &mut violations);
        self.check_template_compatibility(graph, &mut violations);

        let result = ValidationResult::from_violations(violations);
        for warning in &result.warnings {
            warn!(definition = %warning.definition_ref, kind = %warning.kind, "{}", warning.message);
        }
        debug!(
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validated reference graph"
        );
        result
    }

    fn check_duplicate_owners(&self, graph: &ReferenceGraph, out: &mut Vec<Violation>) {
        for duplicate in graph.duplicate_owners() {
            let (Some(first), Some(second)) = (
                graph.definition(duplicate.first),
                graph.definition(duplicate.duplicate),
            ) else {
                continue;
            };
            out.push(Violation::new(
                second.definition_ref(),
                ViolationKind::DuplicateOwnership,
                format!(
                    "ClusterRole 'impersonate-{}' is already owned by {}; mark this definition \
                     as reusing it or rename one of them",
                    duplicate.name,
                    describe(first)
                ),
            ));
        }
    }

    fn check_unresolved(&self, graph: &ReferenceGraph, out: &mut Vec<Violation>) {
        for id in graph.unresolved() {
            let Some(definition) = graph.definition(*id) else {
                continue;
            };
            out.push(Violation::new(
                definition.definition_ref(),
                ViolationKind::UnresolvedReuse,
                format!(
                    "reuses ClusterRole 'impersonate-{}' but no definition named '{}' owns it",
                    definition.name, definition.name
                ),
            ));
        }
    }

    fn check_scope_collisions(&self, graph: &ReferenceGraph, out: &mut Vec<Violation>) {
        // (name, cluster, namespace) -> first definition claiming it
        let mut claimed: BTreeMap<(&str, &str, &str), DefinitionId> = BTreeMap::new();

        for (id, definition) in graph.definitions().iter().enumerate() {
            let mut clashes: Vec<String> = Vec::new();
            for (cluster, namespace) in definition.scopes() {
                let key = (definition.name.as_str(), cluster, namespace);
                match claimed.get(&key) {
                    Some(first) => {
                        if let Some(other) = graph.definition(*first) {
                            clashes.push(format!(
                                "{}/{} (already claimed by {})",
                                cluster,
                                namespace,
                                other.definition_ref()
                            ));
                        }
                    }
                    None => {
                        claimed.insert(key, id);
                    }
                }
            }

            if !clashes.is_empty() {
                out.push(Violation::new(
                    definition.definition_ref(),
                    ViolationKind::ScopeCollision,
                    format!(
                        "role '{}' is generated twice for {}",
                        definition.name,
                        clashes.join(", ")
                    ),
                ));
            }
        }
    }

    fn check_template_compatibility(&self, graph: &ReferenceGraph, out: &mut Vec<Violation>) {
        for edge in graph.edges() {
            let (Some(reuser), Some(owner)) = (graph.definition(edge.from), graph.definition(edge.to))
            else {
                continue;
            };
            if reuser.namespace_role_template != owner.namespace_role_template {
                out.push(Violation::new(
                    reuser.definition_ref(),
                    ViolationKind::TemplateMismatch,
                    format!(
                        "uses template '{}' but reuses the ClusterRole of {} which uses '{}'",
                        reuser.namespace_role_template,
                        owner.definition_ref(),
                        owner.namespace_role_template
                    ),
                ));
            }
        }
    }
}

fn describe(definition: &RoleDefinition) -> String {
    match &definition.source {
        Some(source) => format!("{} ({})", definition.definition_ref(), source),
        None => definition.definition_ref().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ClusterRoleMode;
    use crate::graph::ReferenceGraphBuilder;

    fn def(name: &str, mode: ClusterRoleMode, namespaces: &[&str], index: usize) -> RoleDefinition {
        RoleDefinition {
            name: name.to_string(),
            namespace_role_template: "oncall".to_string(),
            namespaces: namespaces.iter().map(ToString::to_string).collect(),
            clusters: vec!["prod".to_string()],
            cluster_role_mode: mode,
            extra_namespace_rules: Vec::new(),
            sequence_index: index,
            source: None,
        }
    }

    fn validate(definitions: Vec<RoleDefinition>) -> ValidationResult {
        GraphValidator::new().validate(&ReferenceGraphBuilder::with_definitions(definitions).build())
    }

    #[test]
    fn test_valid_graph() {
        let result = validate(vec![
            def("foo", ClusterRoleMode::Owns, &["a"], 0),
            def("foo", ClusterRoleMode::Reuses, &["b"], 1),
        ]);

        assert!(result.is_valid());
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unresolved_reuse() {
        let result = validate(vec![def("bar", ClusterRoleMode::Reuses, &["a"], 0)]);

        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ViolationKind::UnresolvedReuse);
        assert_eq!(result.errors[0].definition_ref, DefinitionRef::new("bar", 0));
    }

    #[test]
    fn test_duplicate_ownership_message() {
        let mut first = def("baz", ClusterRoleMode::Owns, &["a"], 0);
        first.source = Some("teams/a.yaml".to_string());
        let result = validate(vec![first, def("baz", ClusterRoleMode::Owns, &["b"], 1)]);

        let errors: Vec<_> = result.errors_of(ViolationKind::DuplicateOwnership).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].definition_ref.position, 1);
        assert!(errors[0].message.contains("baz#0 (teams/a.yaml)"));
    }

    #[test]
    fn test_scope_collision() {
        let result = validate(vec![
            def("foo", ClusterRoleMode::Owns, &["a", "b"], 0),
            def("foo", ClusterRoleMode::Reuses, &["b", "c"], 1),
        ]);

        let errors: Vec<_> = result.errors_of(ViolationKind::ScopeCollision).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("prod/b (already claimed by foo#0)"));
    }

    #[test]
    fn test_same_namespace_different_names_is_fine() {
        let result = validate(vec![
            def("foo", ClusterRoleMode::Owns, &["shared"], 0),
            def("bar", ClusterRoleMode::Owns, &["shared"], 1),
        ]);

        assert!(result.is_valid());
    }

    #[test]
    fn test_template_mismatch_is_warning() {
        let mut reuser = def("foo", ClusterRoleMode::Reuses, &["b"], 1);
        reuser.namespace_role_template = "readonly".to_string();

        let result = validate(vec![def("foo", ClusterRoleMode::Owns, &["a"], 0), reuser]);

        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, ViolationKind::TemplateMismatch);
        assert!(result.warnings[0].message.contains("'readonly'"));
    }

    #[test]
    fn test_violation_display() {
        let violation = Violation::new(
            DefinitionRef::new("bar", 2),
            ViolationKind::UnresolvedReuse,
            "no owner",
        );
        assert_eq!(violation.to_string(), "bar#2 UnresolvedReuse: no owner");
    }
}
