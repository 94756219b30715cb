//! Reference graph for ClusterRole reuse
//!
//! Definitions live in an arena (the normalized vector) and are addressed by
//! index. The graph records:
//! 1. The ownership table: role name -> the one definition owning its ClusterRole
//! 2. Reuse edges: reusing definition -> owner, looked up by name
//! 3. Conflicts: duplicate owners and reuse edges without an owner
//!
//! Resolution never looks at where a definition sits relative to its owner,
//! so reordering the input cannot break a valid edge.

use crate::definition::{ClusterRoleMode, RoleDefinition};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Index of a definition in the graph's arena
pub type DefinitionId = usize;

/// Role name -> owning definition
///
/// Built once per run and shared by the validator and the synthesizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterRoleOwnership {
    owners: BTreeMap<String, DefinitionId>,
}

impl ClusterRoleOwnership {
    pub fn get(&self, name: &str) -> Option<DefinitionId> {
        self.owners.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.owners.contains_key(name)
    }

    /// Owned names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DefinitionId)> {
        self.owners.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Register an owner; returns the already registered one on conflict
    fn register(&mut self, name: &str, id: DefinitionId) -> Option<DefinitionId> {
        match self.owners.get(name) {
            Some(existing) => Some(*existing),
            None => {
                self.owners.insert(name.to_string(), id);
                None
            }
        }
    }
}

/// Reusing definition -> owning definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReuseEdge {
    pub from: DefinitionId,
    pub to: DefinitionId,
}

/// A second `Owns` definition for an already owned name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateOwner {
    pub name: String,
    /// The owner registered first in authoring order
    pub first: DefinitionId,
    pub duplicate: DefinitionId,
}

/// Derived reference graph for one generation run
#[derive(Debug, Clone)]
pub struct ReferenceGraph {
    definitions: Vec<RoleDefinition>,
    ownership: ClusterRoleOwnership,
    edges: Vec<ReuseEdge>,
    unresolved: Vec<DefinitionId>,
    duplicates: Vec<DuplicateOwner>,
}

impl ReferenceGraph {
    pub fn definitions(&self) -> &[RoleDefinition] {
        &self.definitions
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&RoleDefinition> {
        self.definitions.get(id)
    }

    pub fn ownership(&self) -> &ClusterRoleOwnership {
        &self.ownership
    }

    pub fn edges(&self) -> &[ReuseEdge] {
        &self.edges
    }

    /// Reusing definitions whose name has no owner
    pub fn unresolved(&self) -> &[DefinitionId] {
        &self.unresolved
    }

    pub fn duplicate_owners(&self) -> &[DuplicateOwner] {
        &self.duplicates
    }

    /// True when every reuse edge resolved and no name has two owners
    pub fn is_consistent(&self) -> bool {
        self.unresolved.is_empty() && self.duplicates.is_empty()
    }

    /// The definition whose ClusterRole `id` is bound through
    ///
    /// For the registered owner this is itself; for a reusing definition it is
    /// the edge target. Duplicate owners and unresolved reusers have none.
    pub fn owner_of(&self, id: DefinitionId) -> Option<DefinitionId> {
        let definition = self.definitions.get(id)?;
        match definition.cluster_role_mode {
            ClusterRoleMode::Owns => self
                .ownership
                .get(&definition.name)
                .filter(|owner| *owner == id),
            ClusterRoleMode::Reuses => self
                .edges
                .iter()
                .find(|edge| edge.from == id)
                .map(|edge| edge.to),
        }
    }

    /// Definitions reusing the ClusterRole owned by `owner`
    pub fn reusers_of(&self, owner: DefinitionId) -> impl Iterator<Item = DefinitionId> + '_ {
        self.edges
            .iter()
            .filter(move |edge| edge.to == owner)
            .map(|edge| edge.from)
    }

    /// Every definition sharing `name`, in authoring order
    pub fn definitions_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (DefinitionId, &'a RoleDefinition)> + 'a {
        self.definitions
            .iter()
            .enumerate()
            .filter(move |(_, def)| def.name == name)
    }
}

/// Collects definitions and builds the reference graph
///
/// # Example
///
/// ```ignore
/// let mut builder = ReferenceGraphBuilder::new();
/// builder.add_definition(owner);
/// builder.add_definition(reuser);
///
/// let graph = builder.build();
/// assert!(graph.is_consistent());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraphBuilder {
    definitions: Vec<RoleDefinition>,
}

impl ReferenceGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already normalized collection
    pub fn with_definitions(definitions: Vec<RoleDefinition>) -> Self {
        Self { definitions }
    }

    pub fn add_definition(&mut self, definition: RoleDefinition) {
        self.definitions.push(definition);
    }

    /// Build the graph
    ///
    /// Never fails: conflicts are recorded on the graph so the validator can
    /// report all of them together.
    ///
    /// # Algorithm
    ///
    /// 1. Walk definitions in authoring order, registering every `Owns`
    ///    definition; a name already registered is a duplicate owner
    /// 2. Walk again and point every `Reuses` definition at the final
    ///    owner for its name, or record it as unresolved
    pub fn build(self) -> ReferenceGraph {
        let definitions = self.definitions;
        let mut ownership = ClusterRoleOwnership::default();
        let mut duplicates = Vec::new();

        for (id, definition) in definitions.iter().enumerate() {
            if !definition.owns_cluster_role() {
                continue;
            }
            if let Some(first) = ownership.register(&definition.name, id) {
                duplicates.push(DuplicateOwner {
                    name: definition.name.clone(),
                    first,
                    duplicate: id,
                });
            }
        }

        let mut edges = Vec::new();
        let mut unresolved = Vec::new();

        for (id, definition) in definitions.iter().enumerate() {
            if definition.owns_cluster_role() {
                continue;
            }
            match ownership.get(&definition.name) {
                Some(owner) => edges.push(ReuseEdge { from: id, to: owner }),
                None => unresolved.push(id),
            }
        }

        debug!(
            definitions = definitions.len(),
            owners = ownership.len(),
            edges = edges.len(),
            unresolved = unresolved.len(),
            duplicates = duplicates.len(),
            "built reference graph"
        );

        ReferenceGraph {
            definitions,
            ownership,
            edges,
            unresolved,
            duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, mode: ClusterRoleMode, index: usize) -> RoleDefinition {
        RoleDefinition {
            name: name.to_string(),
            namespace_role_template: "oncall".to_string(),
            namespaces: vec![format!("ns-{}", index)],
            clusters: vec!["prod".to_string()],
            cluster_role_mode: mode,
            extra_namespace_rules: Vec::new(),
            sequence_index: index,
            source: None,
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = ReferenceGraphBuilder::new().build();

        assert!(graph.definitions().is_empty());
        assert!(graph.ownership().is_empty());
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_owner_and_reuser() {
        let mut builder = ReferenceGraphBuilder::new();
        builder.add_definition(def("foo", ClusterRoleMode::Owns, 0));
        builder.add_definition(def("foo", ClusterRoleMode::Reuses, 1));

        let graph = builder.build();

        assert_eq!(graph.ownership().get("foo"), Some(0));
        assert_eq!(graph.edges(), &[ReuseEdge { from: 1, to: 0 }]);
        assert_eq!(graph.owner_of(0), Some(0));
        assert_eq!(graph.owner_of(1), Some(0));
        assert_eq!(graph.reusers_of(0).collect::<Vec<_>>(), vec![1]);
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_reuser_declared_before_owner() {
        let graph = ReferenceGraphBuilder::with_definitions(vec![
            def("foo", ClusterRoleMode::Reuses, 0),
            def("foo", ClusterRoleMode::Owns, 1),
        ])
        .build();

        assert_eq!(graph.edges(), &[ReuseEdge { from: 0, to: 1 }]);
        assert!(graph.unresolved().is_empty());
    }

    #[test]
    fn test_reuse_does_not_cross_names() {
        let graph = ReferenceGraphBuilder::with_definitions(vec![
            def("foo", ClusterRoleMode::Owns, 0),
            def("bar", ClusterRoleMode::Reuses, 1),
        ])
        .build();

        assert!(graph.edges().is_empty());
        assert_eq!(graph.unresolved(), &[1]);
        assert_eq!(graph.owner_of(1), None);
        assert!(!graph.is_consistent());
    }

    #[test]
    fn test_duplicate_owner_recorded() {
        let graph = ReferenceGraphBuilder::with_definitions(vec![
            def("baz", ClusterRoleMode::Owns, 0),
            def("baz", ClusterRoleMode::Owns, 1),
            def("baz", ClusterRoleMode::Owns, 2),
        ])
        .build();

        let duplicates = graph.duplicate_owners();
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].first, 0);
        assert_eq!(duplicates[0].duplicate, 1);
        assert_eq!(duplicates[1].duplicate, 2);
        assert_eq!(graph.owner_of(0), Some(0));
        assert_eq!(graph.owner_of(2), None);
    }

    #[test]
    fn test_definitions_named() {
        let graph = ReferenceGraphBuilder::with_definitions(vec![
            def("foo", ClusterRoleMode::Owns, 0),
            def("bar", ClusterRoleMode::Owns, 1),
            def("foo", ClusterRoleMode::Reuses, 2),
        ])
        .build();

        let ids: Vec<_> = graph.definitions_named("foo").map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(graph.ownership().names().collect::<Vec<_>>(), vec!["bar", "foo"]);
    }
}
