//! Dependency graph between planning units.
//!
//! Node weights are indices into the unit slice the graph was built from. An edge
//! `a -> b` means unit `a` references a name unit `b` declares: any name declared inside
//! `b` when both live in the same file, or `b`'s top-level name in another file when the
//! name is not declared locally.

use crate::atoms::Atom;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) struct UnitGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
    files: Vec<usize>,
}

impl UnitGraph {
    /// Build the graph over `units`; atoms without unit info become isolated nodes.
    pub fn build(units: &[&Atom]) -> Self {
        let mut graph = DiGraph::with_capacity(units.len(), units.len());
        let nodes: Vec<NodeIndex> = (0..units.len()).map(|i| graph.add_node(i)).collect();
        let files = units.iter().map(|atom| atom.file_index).collect();

        // name -> units declaring it; BTreeMap keeps edge insertion deterministic
        let mut local: BTreeMap<(usize, &str), BTreeSet<usize>> = BTreeMap::new();
        let mut global: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
        for (i, atom) in units.iter().enumerate() {
            let Some(info) = atom.unit() else { continue };
            for name in &info.defines {
                local.entry((atom.file_index, name.as_str())).or_default().insert(i);
            }
            if let Some(name) = &info.name {
                global.entry(name.as_str()).or_default().insert(i);
            }
        }

        for (i, atom) in units.iter().enumerate() {
            let Some(info) = atom.unit() else { continue };
            let mut targets: BTreeSet<usize> = BTreeSet::new();
            for dependency in &info.dependencies {
                let dependency = dependency.as_str();
                // a name declared in the same file shadows other files
                if let Some(found) = local.get(&(atom.file_index, dependency)) {
                    targets.extend(found);
                } else if let Some(found) = global.get(dependency) {
                    targets.extend(found);
                }
            }
            targets.remove(&i);
            for j in targets {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }

        Self {
            graph,
            nodes,
            files,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Units `unit` depends on directly, ascending
    pub fn dependencies(&self, unit: usize) -> Vec<usize> {
        let mut targets: Vec<usize> = self
            .graph
            .edges_directed(self.nodes[unit], Direction::Outgoing)
            .map(|edge| self.graph[edge.target()])
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// Weakly connected components restricted to same-file edges.
    ///
    /// Components are ordered by their first unit; members ascend.
    pub fn file_components(&self) -> Vec<Vec<usize>> {
        let mut sets = UnionFind::new(self.nodes.len());
        for edge in self.graph.edge_references() {
            let (a, b) = (self.graph[edge.source()], self.graph[edge.target()]);
            if self.files[a] == self.files[b] {
                sets.union(a, b);
            }
        }

        let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut first_of_root: BTreeMap<usize, usize> = BTreeMap::new();
        for unit in 0..self.nodes.len() {
            let first = *first_of_root.entry(sets.find(unit)).or_insert(unit);
            components.entry(first).or_default().push(unit);
        }
        components.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::{AtomKind, UnitInfo};

    fn unit(file_index: usize, start: usize, name: &str, defines: &[&str], deps: &[&str]) -> Atom {
        Atom {
            file_index,
            start_byte: start,
            end_byte: start + 10,
            start_line: 1,
            end_line: 1,
            tokens: 3,
            kind: AtomKind::Unit(UnitInfo {
                name: Some(name.to_string()),
                defines: std::iter::once(name)
                    .chain(defines.iter().copied())
                    .map(String::from)
                    .collect(),
                dependencies: deps.iter().map(|d| d.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_edges_resolve_within_and_across_files() {
        let atoms = vec![
            unit(0, 0, "Store", &["get"], &[]),
            unit(0, 10, "handler", &[], &["get", "render"]),
            unit(1, 0, "render", &[], &["Store"]),
            unit(1, 10, "get", &[], &[]),
        ];
        let refs: Vec<&Atom> = atoms.iter().collect();
        let graph = UnitGraph::build(&refs);

        // `get` resolves locally to Store, not to the top-level `get` of file 1
        assert_eq!(graph.dependencies(1), vec![0, 2]);
        assert_eq!(graph.dependencies(2), vec![0]);
        assert!(graph.dependencies(3).is_empty());
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_file_components_ignore_cross_file_edges() {
        let atoms = vec![
            unit(0, 0, "a", &[], &["c"]),
            unit(0, 10, "b", &[], &["x"]),
            unit(0, 20, "c", &[], &[]),
            unit(1, 0, "x", &[], &["a"]),
        ];
        let refs: Vec<&Atom> = atoms.iter().collect();
        let graph = UnitGraph::build(&refs);

        assert_eq!(graph.file_components(), vec![vec![0, 2], vec![1], vec![3]]);
    }
}
