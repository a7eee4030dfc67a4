//! The resolved assignment as a dependency graph.
//!
//! Backed by petgraph; wired dependent to dependency. Used for the output
//! ordering, tree rendering, and "who introduced this" path queries.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use concord_core::unit::UnitVersion;

/// Edge label: the constraint expression the dependent declared, if any.
#[derive(Debug, Clone)]
pub struct DepEdge {
    pub expr: Option<String>,
}

/// The chosen versions of a complete assignment and their dependency edges.
#[derive(Debug)]
pub struct ResolvedGraph {
    graph: DiGraph<Arc<UnitVersion>, DepEdge>,
    index: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl ResolvedGraph {
    /// Build the graph for a complete assignment. Dependency edges to units
    /// outside the assignment cannot occur in a complete solution and are
    /// skipped.
    pub fn new(roots: &[&str], assignment: &BTreeMap<String, Arc<UnitVersion>>) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for (name, uv) in assignment {
            let idx = graph.add_node(uv.clone());
            index.insert(name.clone(), idx);
        }
        for (name, uv) in assignment {
            let Some(&from) = index.get(name) else {
                continue;
            };
            for dep in uv.dependencies() {
                if let Some(&to) = index.get(dep) {
                    let expr = uv.constraint_on(dep).map(|c| c.expr().to_string());
                    graph.add_edge(from, to, DepEdge { expr });
                }
            }
        }
        let roots = roots
            .iter()
            .filter_map(|root| index.get(*root).copied())
            .collect();
        Self {
            graph,
            index,
            roots,
        }
    }

    /// Look up a unit by name.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &Arc<UnitVersion> {
        &self.graph[idx]
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct dependencies in declaration order.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        // petgraph iterates edges newest-first; reverse restores the order
        // the dependent declared them in.
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        deps.reverse();
        deps
    }

    /// Reverse dependencies (who depends on this unit).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect()
    }

    /// Units in consumption order: each root followed by its dependencies,
    /// depth-first over declaration order, duplicates suppressed.
    pub fn ordered_units(&self) -> Vec<Arc<UnitVersion>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for &root in &self.roots {
            self.preorder(root, &mut out, &mut seen);
        }
        out
    }

    fn preorder(
        &self,
        idx: NodeIndex,
        out: &mut Vec<Arc<UnitVersion>>,
        seen: &mut HashSet<NodeIndex>,
    ) {
        if !seen.insert(idx) {
            return;
        }
        out.push(self.graph[idx].clone());
        for (child, _) in self.dependencies_of(idx) {
            self.preorder(child, out, seen);
        }
    }

    /// Render the assignment as a tree from the roots, one constraint label
    /// per pinned or ranged edge.
    pub fn print_tree(&self) -> String {
        let mut output = String::new();
        for &root in &self.roots {
            let node = &self.graph[root];
            output.push_str(&format!("{node}\n"));
            let mut visited = HashSet::new();
            visited.insert(root);
            let deps = self.dependencies_of(root);
            let count = deps.len();
            for (i, (child, edge)) in deps.into_iter().enumerate() {
                self.print_subtree(&mut output, child, edge, "", i == count - 1, &mut visited);
            }
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DepEdge,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        match &edge.expr {
            Some(expr) => output.push_str(&format!("{prefix}{connector}{node} ({expr})\n")),
            None => output.push_str(&format!("{prefix}{connector}{node}\n")),
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, edge)) in deps.into_iter().enumerate() {
            self.print_subtree(output, child, edge, &child_prefix, i == count - 1, visited);
        }

        visited.remove(&idx);
    }

    /// Find the introduction path from a root to a unit.
    pub fn find_path(&self, target: &str) -> Option<Vec<&Arc<UnitVersion>>> {
        let target = self.find(target)?;
        for &root in &self.roots {
            let mut path = Vec::new();
            let mut visited = HashSet::new();
            if self.dfs_path(root, target, &mut path, &mut visited) {
                return Some(path.iter().map(|&idx| &self.graph[idx]).collect());
            }
        }
        None
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }
}
