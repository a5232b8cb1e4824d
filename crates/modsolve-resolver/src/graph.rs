//! The release graph: every release reachable from a set of root
//! requirements, fetched once per module name from every source.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use modsolve_core::range::VersionRange;
use modsolve_core::version::Version;

use crate::constraint::ConstraintSet;
use crate::source::Source;

/// Position of a source in the resolver's registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub usize);

/// A release with parsed dependency ranges, tagged with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRelease {
    pub name: String,
    pub version: Version,
    pub dependencies: BTreeMap<String, VersionRange>,
    pub source: SourceId,
    pub priority: i32,
}

impl ModuleRelease {
    /// Search order: newest version first, then higher source priority, then
    /// the earlier registered source.
    pub fn preference(&self, other: &Self) -> Ordering {
        other
            .version
            .cmp(&self.version)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.source.cmp(&other.source))
    }

    pub fn satisfies(&self, range: &VersionRange) -> bool {
        range.includes(&self.version)
    }
}

impl fmt::Display for ModuleRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A range contributed by a selected release.
#[derive(Debug, Clone)]
pub(crate) struct Dependent {
    pub(crate) release: String,
    pub(crate) range: VersionRange,
}

/// Per-name state: the candidates plus what the search currently demands.
#[derive(Debug, Clone)]
pub(crate) struct PackageNode {
    pub(crate) name: String,
    /// Sorted by [`ModuleRelease::preference`].
    pub(crate) releases: Vec<ModuleRelease>,
    pub(crate) requirement: Option<VersionRange>,
    /// `None` while nothing needs this module.
    pub(crate) effective: Option<VersionRange>,
    pub(crate) dependents: Vec<Dependent>,
    pub(crate) selected: Option<usize>,
}

impl PackageNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            releases: Vec::new(),
            requirement: None,
            effective: None,
            dependents: Vec::new(),
            selected: None,
        }
    }
}

/// Every module reachable from the root requirements, in discovery order.
#[derive(Debug)]
pub struct ReleaseGraph {
    pub(crate) nodes: Vec<PackageNode>,
    index: HashMap<String, usize>,
    roots: Vec<String>,
    pub(crate) constraints: ConstraintSet,
    source_labels: Vec<String>,
}

impl ReleaseGraph {
    fn with_sources(sources: &[Arc<dyn Source>]) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            constraints: ConstraintSet::new(),
            source_labels: sources.iter().map(|s| s.label().to_string()).collect(),
        }
    }

    /// Breadth-first discovery from `requirements`. Each source is asked for
    /// each name exactly once, which also stops dependency cycles.
    pub(crate) fn discover(
        sources: &[Arc<dyn Source>],
        requirements: Vec<(String, VersionRange)>,
    ) -> miette::Result<Self> {
        let mut graph = Self::with_sources(sources);
        let mut queue = VecDeque::new();
        for (name, range) in requirements {
            if let (id, true) = graph.require(name, range) {
                queue.push_back(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            let releases = fetch_releases(sources, &graph.nodes[id].name)?;
            for release in &releases {
                for dep in release.dependencies.keys() {
                    if let (dep_id, true) = graph.intern(dep) {
                        queue.push_back(dep_id);
                    }
                }
            }
            tracing::debug!(
                "Discovered {} release(s) of {}",
                releases.len(),
                graph.nodes[id].name
            );
            graph.nodes[id].releases = releases;
        }
        Ok(graph)
    }

    /// A graph holding only `name`, with every release's dependencies dropped.
    pub(crate) fn single(
        sources: &[Arc<dyn Source>],
        name: &str,
        range: VersionRange,
    ) -> miette::Result<Self> {
        let mut graph = Self::with_sources(sources);
        let (id, _) = graph.require(name.to_string(), range);
        let mut releases = fetch_releases(sources, name)?;
        for release in &mut releases {
            release.dependencies.clear();
        }
        graph.nodes[id].releases = releases;
        Ok(graph)
    }

    /// Record a root requirement. A name required twice gets the intersection.
    fn require(&mut self, name: String, range: VersionRange) -> (usize, bool) {
        let (id, new) = self.intern(&name);
        let node = &mut self.nodes[id];
        let range = match node.requirement.take() {
            Some(previous) => previous.intersection(&range),
            None => range,
        };
        node.effective = Some(range.clone());
        node.requirement = Some(range);
        if !self.roots.contains(&name) {
            self.roots.push(name);
        }
        (id, new)
    }

    /// The node for `name`, created if missing. The flag is true for new nodes.
    fn intern(&mut self, name: &str) -> (usize, bool) {
        if let Some(&id) = self.index.get(name) {
            return (id, false);
        }
        let id = self.nodes.len();
        self.nodes.push(PackageNode::new(name));
        self.index.insert(name.to_string(), id);
        (id, true)
    }

    pub(crate) fn node_id(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn node(&self, name: &str) -> Option<&PackageNode> {
        self.node_id(name).map(|id| &self.nodes[id])
    }

    /// Every module name in the graph, in discovery order (roots first).
    pub fn dependency_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Root module names, in the order they were requested.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All known releases of `name`, most preferred first.
    pub fn releases(&self, name: &str) -> &[ModuleRelease] {
        self.node(name).map_or(&[][..], |n| n.releases.as_slice())
    }

    /// The root requirement on `name`, if it was requested directly.
    pub fn requirement(&self, name: &str) -> Option<&VersionRange> {
        self.node(name).and_then(|n| n.requirement.as_ref())
    }

    pub fn source_label(&self, source: SourceId) -> Option<&str> {
        self.source_labels.get(source.0).map(String::as_str)
    }

    /// Register a named predicate every selected release of `module` must pass.
    pub fn add_constraint<F>(
        &mut self,
        label: impl Into<String>,
        module: impl Into<String>,
        description: impl Into<String>,
        predicate: F,
    ) where
        F: Fn(&ModuleRelease) -> bool + Send + Sync + 'static,
    {
        self.constraints
            .add_module(label, module, description, predicate);
    }

    /// Register a named predicate over the complete selection.
    pub fn add_graph_constraint<F>(&mut self, label: impl Into<String>, predicate: F)
    where
        F: Fn(&[&ModuleRelease]) -> bool + Send + Sync + 'static,
    {
        self.constraints.add_graph(label, predicate);
    }

    /// `(label, description)` of every constraint on `name`.
    pub fn constraints_for(&self, name: &str) -> Vec<(&str, &str)> {
        self.constraints
            .for_module(name)
            .iter()
            .map(|c| (c.label(), c.description()))
            .collect()
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Roots for which no known release matches the root requirement.
    pub fn unsatisfied(&self) -> Vec<String> {
        self.roots
            .iter()
            .filter(|name| match self.node(name) {
                Some(node) => !node.releases.iter().any(|r| match &node.requirement {
                    Some(range) => r.satisfies(range),
                    None => true,
                }),
                None => true,
            })
            .cloned()
            .collect()
    }
}

/// Every release of `name` across `sources`, most preferred first.
///
/// Descriptors for other names are skipped, and a version listed twice by
/// the same source is kept once.
pub(crate) fn fetch_releases(
    sources: &[Arc<dyn Source>],
    name: &str,
) -> miette::Result<Vec<ModuleRelease>> {
    let mut releases: Vec<ModuleRelease> = Vec::new();
    for (position, source) in sources.iter().enumerate() {
        let id = SourceId(position);
        let descriptors = source.fetch(name)?;
        tracing::debug!(
            "Source '{}' listed {} release(s) of {name}",
            source.label(),
            descriptors.len()
        );

        for descriptor in descriptors {
            if descriptor.name != name {
                tracing::warn!(
                    "Source '{}' returned {} {} when asked for {name}, skipping",
                    source.label(),
                    descriptor.name,
                    descriptor.version
                );
                continue;
            }
            if releases
                .iter()
                .any(|r| r.source == id && r.version == descriptor.version)
            {
                tracing::debug!(
                    "Source '{}' listed {name} {} twice",
                    source.label(),
                    descriptor.version
                );
                continue;
            }

            let mut dependencies = BTreeMap::new();
            for (dep, expr) in &descriptor.dependencies {
                dependencies.insert(dep.clone(), VersionRange::parse(expr)?);
            }
            releases.push(ModuleRelease {
                name: descriptor.name,
                version: descriptor.version,
                dependencies,
                source: id,
                priority: source.priority(),
            });
        }
    }
    releases.sort_by(ModuleRelease::preference);
    Ok(releases)
}
