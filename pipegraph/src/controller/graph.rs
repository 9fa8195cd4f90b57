//! Dependency graph construction and validation.
//!
//! The graph is built once per configuration load: components are
//! instantiated through the registry, references in declared arguments are
//! statically extracted to derive dependency→dependent edges, and the result
//! is validated acyclic before it can be activated. Edges are immutable
//! while the graph is active; structural changes build a whole new graph.

use super::error::ControllerError;
use super::node::ComponentNode;
use crate::component::registry::BuildContext;
use crate::component::value::collect_references;
use crate::component::{ComponentDecl, ComponentId, ComponentRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The validated set of component nodes and dependency edges.
pub struct DependencyGraph {
    nodes: HashMap<ComponentId, Arc<ComponentNode>>,
    /// id → ids whose arguments reference this id's export.
    dependents: HashMap<ComponentId, Vec<ComponentId>>,
    /// id → ids this id's arguments reference.
    dependencies: HashMap<ComponentId, Vec<ComponentId>>,
    edge_count: usize,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
            dependents: HashMap::new(),
            dependencies: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Builds and validates a graph from declared components.
    ///
    /// Fails without side effects on duplicate ids, unknown kinds, unknown
    /// references, or a dependency cycle; a previously active graph is
    /// unaffected by a failed build.
    pub fn build(
        registry: &ComponentRegistry,
        decls: &[ComponentDecl],
    ) -> Result<Self, ControllerError> {
        let mut graph = Self::empty();

        // Instantiate every node first so reference resolution can see the
        // full id set.
        for decl in decls {
            if graph.nodes.contains_key(&decl.id) {
                return Err(ControllerError::DuplicateId(decl.id.clone()));
            }
            let cx = BuildContext {
                id: decl.id.clone(),
            };
            let component = registry.build(&cx, &decl.kind, &decl.arguments)?;
            let node = ComponentNode::new(
                decl.id.clone(),
                decl.kind.clone(),
                decl.arguments.clone(),
                component,
            );
            graph.nodes.insert(decl.id.clone(), Arc::new(node));
        }

        // Derive edges from references: dependency → dependent.
        for decl in decls {
            let mut seen = HashSet::new();
            for reference in collect_references(&decl.arguments) {
                let (target, _) = graph.resolve_reference(&reference).ok_or_else(|| {
                    ControllerError::UnknownReference {
                        id: decl.id.clone(),
                        reference: reference.clone(),
                    }
                })?;
                let target_id = target.id().clone();
                if !seen.insert(target_id.clone()) {
                    continue;
                }
                graph
                    .dependents
                    .entry(target_id.clone())
                    .or_default()
                    .push(decl.id.clone());
                graph
                    .dependencies
                    .entry(decl.id.clone())
                    .or_default()
                    .push(target_id);
                graph.edge_count += 1;
            }
        }

        if let Some(chain) = graph.find_cycle() {
            return Err(ControllerError::Cycle {
                chain: chain.iter().map(|id| id.to_string()).collect(),
            });
        }

        Ok(graph)
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &ComponentId) -> Option<&Arc<ComponentNode>> {
        self.nodes.get(id)
    }

    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<ComponentNode>> {
        self.nodes.values()
    }

    /// Returns all ids, sorted for deterministic iteration.
    pub fn ids(&self) -> Vec<ComponentId> {
        let mut ids: Vec<ComponentId> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Direct dependents of `id` (components referencing its export).
    pub fn dependents_of(&self, id: &ComponentId) -> &[ComponentId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct dependencies of `id` (components its arguments reference).
    pub fn dependencies_of(&self, id: &ComponentId) -> &[ComponentId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Resolves a reference path to its target node and export field
    /// segments.
    ///
    /// Component ids contain dots, so the target is the *longest* dotted
    /// prefix of the path naming a declared component; the remaining
    /// segments index into that component's export.
    pub(crate) fn resolve_reference<'a>(
        &self,
        path: &'a str,
    ) -> Option<(&Arc<ComponentNode>, Vec<&'a str>)> {
        let segments: Vec<&str> = path.split('.').collect();
        for split in (1..=segments.len()).rev() {
            let candidate = segments[..split].join(".");
            if let Some(node) = self.nodes.get(candidate.as_str()) {
                return Some((node, segments[split..].to_vec()));
            }
        }
        None
    }

    /// Depth-first cycle search with recursion-stack marking.
    ///
    /// Returns the participating chain (first and last id equal) if any
    /// cycle exists.
    fn find_cycle(&self) -> Option<Vec<ComponentId>> {
        let mut marks: HashMap<&ComponentId, MarkState> = HashMap::new();
        let mut stack: Vec<&ComponentId> = Vec::new();

        // Iterate in sorted order so the reported chain is deterministic.
        let mut roots: Vec<&ComponentId> = self.nodes.keys().collect();
        roots.sort();

        for root in roots {
            if marks.contains_key(root) {
                continue;
            }
            if let Some(chain) = self.visit(root, &mut marks, &mut stack) {
                return Some(chain);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        id: &'a ComponentId,
        marks: &mut HashMap<&'a ComponentId, MarkState>,
        stack: &mut Vec<&'a ComponentId>,
    ) -> Option<Vec<ComponentId>> {
        marks.insert(id, MarkState::InStack);
        stack.push(id);

        for dependency in self.dependencies_of(id) {
            match marks.get(dependency) {
                Some(MarkState::Done) => continue,
                Some(MarkState::InStack) => {
                    let start = stack
                        .iter()
                        .position(|entry| *entry == dependency)
                        .unwrap_or(0);
                    let mut chain: Vec<ComponentId> =
                        stack[start..].iter().map(|entry| (*entry).clone()).collect();
                    chain.push(dependency.clone());
                    return Some(chain);
                }
                None => {
                    if let Some(chain) = self.visit(dependency, marks, stack) {
                        return Some(chain);
                    }
                }
            }
        }

        stack.pop();
        marks.insert(id, MarkState::Done);
        None
    }
}

#[derive(Clone, Copy, PartialEq)]
enum MarkState {
    InStack,
    Done,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edge_count)
            .finish()
    }
}
