//! Resolved releases linked into a dependency tree for installation.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use modsolve_core::range::VersionRange;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::graph::ModuleRelease;

/// A resolution result as a petgraph graph. Edges run from a release to the
/// resolved release of each dependency and carry the required range.
#[derive(Debug)]
pub struct InstallPlan {
    graph: DiGraph<ModuleRelease, VersionRange>,
    /// Lookup from module name to node index.
    index: HashMap<String, NodeIndex>,
}

impl InstallPlan {
    /// Link `releases` by their dependencies. Dependencies missing from
    /// `releases` and self-dependencies get no edge.
    pub fn from_releases(releases: &[ModuleRelease]) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for release in releases {
            if index.contains_key(&release.name) {
                continue;
            }
            let idx = graph.add_node(release.clone());
            index.insert(release.name.clone(), idx);
        }

        let mut edges = Vec::new();
        for from in graph.node_indices() {
            for (dep, range) in &graph[from].dependencies {
                match index.get(dep) {
                    Some(&to) if to != from => edges.push((from, to, range.clone())),
                    _ => {}
                }
            }
        }
        for (from, to, range) in edges {
            graph.add_edge(from, to, range);
        }

        Self { graph, index }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn release(&self, idx: NodeIndex) -> &ModuleRelease {
        &self.graph[idx]
    }

    /// Releases in the order they were given.
    pub fn releases(&self) -> impl Iterator<Item = &ModuleRelease> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Direct dependencies of a release, sorted by name.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &VersionRange)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        deps.sort_by(|a, b| self.graph[a.0].name.cmp(&self.graph[b.0].name));
        deps
    }

    /// Releases that depend on this one, sorted by name.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &VersionRange)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        deps.sort_by(|a, b| self.graph[a.0].name.cmp(&self.graph[b.0].name));
        deps
    }

    /// Releases nothing else depends on.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Where the tree starts: the roots, or the first release when every
    /// release sits on a cycle.
    fn tops(&self) -> Vec<NodeIndex> {
        let roots = self.roots();
        if roots.is_empty() {
            self.graph.node_indices().take(1).collect()
        } else {
            roots
        }
    }

    /// Render the dependency tree. A release that already appears on the
    /// path from the top is shown again but not expanded.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut out = String::new();
        for top in self.tops() {
            out.push_str(&format!("{}\n", self.graph[top]));
            let mut path = vec![top];
            self.render_children(&mut out, &mut path, &mut Vec::new(), max_depth);
        }
        out
    }

    /// `open[i]` is true while level `i` still has siblings left to draw.
    fn render_children(
        &self,
        out: &mut String,
        path: &mut Vec<NodeIndex>,
        open: &mut Vec<bool>,
        max_depth: Option<usize>,
    ) {
        let Some(&parent) = path.last() else {
            return;
        };
        let children = self.dependencies_of(parent);
        for (i, &(child, _)) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            for &more in open.iter() {
                out.push_str(if more { "│   " } else { "    " });
            }
            out.push_str(if last { "└── " } else { "├── " });
            out.push_str(&format!("{}\n", self.graph[child]));

            let depth = open.len() + 1;
            if path.contains(&child) || max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            path.push(child);
            open.push(!last);
            self.render_children(out, path, open, max_depth);
            open.pop();
            path.pop();
        }
    }

    /// The shortest chain of releases from a top of the tree down to `name`.
    pub fn find_path(&self, name: &str) -> Option<Vec<&ModuleRelease>> {
        let target = self.find(name)?;
        let mut parent: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::new();
        let mut queue = VecDeque::new();
        for top in self.tops() {
            parent.insert(top, None);
            queue.push_back(top);
        }

        while let Some(idx) = queue.pop_front() {
            if idx == target {
                let mut chain = vec![idx];
                let mut current = idx;
                while let Some(&Some(prev)) = parent.get(&current) {
                    chain.push(prev);
                    current = prev;
                }
                chain.reverse();
                return Some(chain.into_iter().map(|i| &self.graph[i]).collect());
            }
            for (child, _) in self.dependencies_of(idx) {
                if let Entry::Vacant(slot) = parent.entry(child) {
                    slot.insert(Some(idx));
                    queue.push_back(child);
                }
            }
        }
        None
    }
}
