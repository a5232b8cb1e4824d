//! Source registration and the backtracking search that picks one release
//! per module.
//!
//! The search walks modules in discovery order. A module is decided once it
//! is needed, either as a root or because a selected release depends on it.
//! Every selection and every range narrowing goes on a trail, and
//! backtracking pops the trail back to the mark taken before the rejected
//! candidate, so the graph ends up exactly as it started.

use std::fmt;
use std::sync::Arc;

use modsolve_core::config::{ResolverConfig, SolverSettings};
use modsolve_core::range::VersionRange;
use modsolve_util::errors::{ModError, ModResult};

use crate::graph::{self, Dependent, ModuleRelease, ReleaseGraph};
use crate::source::{IndexSource, Source};

/// Registered sources plus search settings. Builds release graphs and
/// resolves them.
pub struct ModuleResolver {
    sources: Vec<Arc<dyn Source>>,
    settings: SolverSettings,
}

impl ModuleResolver {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            settings: SolverSettings::default(),
        }
    }

    /// A resolver with one index source per `[[sources]]` entry.
    pub fn from_config(config: &ResolverConfig) -> ModResult<Self> {
        let mut resolver = Self::new();
        resolver.settings = config.resolver.clone();
        for entry in &config.sources {
            let path = config.index_path(entry);
            let source = IndexSource::from_path(&entry.label, &path)?.with_priority(entry.priority);
            tracing::debug!(
                "Registered source '{}' from {}",
                entry.label,
                path.display()
            );
            resolver.add_source(Arc::new(source));
        }
        Ok(resolver)
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn set_prefer_stable(&mut self, prefer_stable: bool) {
        self.settings.prefer_stable = prefer_stable;
    }

    pub fn add_source(&mut self, source: Arc<dyn Source>) {
        self.sources.push(source);
    }

    pub fn clear_sources(&mut self) {
        self.sources.clear();
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    /// Build the release graph for `requirements` (module name, range expression).
    pub fn query<I, K, V>(&self, requirements: I) -> ModResult<ReleaseGraph>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for (name, expr) in requirements {
            parsed.push((name.into(), VersionRange::parse(expr.as_ref())?));
        }
        ReleaseGraph::discover(&self.sources, parsed)
    }

    /// A graph with only `name`, its releases stripped of dependencies.
    pub fn query_single(&self, name: &str, range: &str) -> ModResult<ReleaseGraph> {
        let range = VersionRange::parse(range)?;
        ReleaseGraph::single(&self.sources, name, range)
    }

    /// Every release of `name` across all sources, without following dependencies.
    pub fn fetch_releases(&self, name: &str) -> ModResult<Vec<ModuleRelease>> {
        graph::fetch_releases(&self.sources, name)
    }

    pub fn resolve(&self, graph: &mut ReleaseGraph) -> ModResult<Vec<ModuleRelease>> {
        resolve_with(graph, &self.settings)
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.sources.iter().map(|s| s.label()).collect();
        f.debug_struct("ModuleResolver")
            .field("sources", &labels)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Resolve `graph` with default settings.
pub fn resolve(graph: &mut ReleaseGraph) -> ModResult<Vec<ModuleRelease>> {
    resolve_with(graph, &SolverSettings::default())
}

/// Pick one release per needed module so that every dependency range and
/// every constraint holds. Releases come back in discovery order.
pub fn resolve_with(
    graph: &mut ReleaseGraph,
    settings: &SolverSettings,
) -> ModResult<Vec<ModuleRelease>> {
    let mut search = Search::new(graph, settings.prefer_stable);
    let outcome = search.run();
    search.undo(0);

    match outcome {
        Ok(releases) => {
            tracing::info!("Resolved {} module(s)", releases.len());
            Ok(releases)
        }
        Err(e) => {
            tracing::debug!("Resolution failed: {e}");
            Err(e.into())
        }
    }
}

struct Frame {
    node: usize,
    candidates: Vec<usize>,
    next: usize,
    mark: usize,
}

enum Trail {
    Selected(usize),
    Narrowed {
        node: usize,
        previous: Option<VersionRange>,
        dependents: usize,
    },
}

/// The deepest dead end seen so far.
struct DeadEnd {
    depth: usize,
    name: String,
    detail: String,
}

struct Search<'g> {
    graph: &'g mut ReleaseGraph,
    prefer_stable: bool,
    trail: Vec<Trail>,
    stack: Vec<Frame>,
    dead_end: Option<DeadEnd>,
    graph_rejection: Option<String>,
}

impl<'g> Search<'g> {
    fn new(graph: &'g mut ReleaseGraph, prefer_stable: bool) -> Self {
        Self {
            graph,
            prefer_stable,
            trail: Vec::new(),
            stack: Vec::new(),
            dead_end: None,
            graph_rejection: None,
        }
    }

    fn run(&mut self) -> Result<Vec<ModuleRelease>, ModError> {
        loop {
            if let Some(node) = self.next_open() {
                let candidates = self.candidates(node);
                tracing::trace!(
                    "Deciding {} ({} candidate(s))",
                    self.graph.nodes[node].name,
                    candidates.len()
                );
                self.stack.push(Frame {
                    node,
                    candidates,
                    next: 0,
                    mark: self.trail.len(),
                });
            } else {
                let label = {
                    let selection = self.selection();
                    match self.graph.constraints.rejecting_selection(&selection) {
                        None => return Ok(selection.into_iter().cloned().collect()),
                        Some(constraint) => constraint.label().to_string(),
                    }
                };
                tracing::trace!("Graph constraint '{label}' rejected the selection");
                self.graph_rejection = Some(label);
            }

            if !self.advance() {
                return Err(self.failure());
            }
        }
    }

    /// The first needed module without a selection.
    fn next_open(&self) -> Option<usize> {
        self.graph
            .nodes
            .iter()
            .position(|n| n.effective.is_some() && n.selected.is_none())
    }

    fn selection(&self) -> Vec<&ModuleRelease> {
        self.graph
            .nodes
            .iter()
            .filter_map(|n| n.selected.map(|i| &n.releases[i]))
            .collect()
    }

    /// Indices of the releases of `id` worth trying, most preferred first.
    fn candidates(&self, id: usize) -> Vec<usize> {
        let node = &self.graph.nodes[id];
        let Some(range) = &node.effective else {
            return Vec::new();
        };
        let admitted: Vec<usize> = (0..node.releases.len())
            .filter(|&i| {
                let release = &node.releases[i];
                if !release.satisfies(range) {
                    return false;
                }
                match self.graph.constraints.rejecting(release) {
                    Some(constraint) => {
                        tracing::trace!("Constraint '{}' rejects {release}", constraint.label());
                        false
                    }
                    None => true,
                }
            })
            .collect();

        if !self.prefer_stable {
            return admitted;
        }
        // Prereleases stay as fallbacks, tried after every stable release.
        let (mut stable, prereleases): (Vec<usize>, Vec<usize>) = admitted
            .into_iter()
            .partition(|&i| node.releases[i].version.is_stable());
        stable.extend(prereleases);
        stable
    }

    /// Move the top frame to its next workable candidate, popping exhausted
    /// frames. Returns false once the stack is empty.
    fn advance(&mut self) -> bool {
        while let Some(top) = self.stack.len().checked_sub(1) {
            let (node, mark) = (self.stack[top].node, self.stack[top].mark);
            self.undo(mark);

            while let Some(&choice) = self.stack[top].candidates.get(self.stack[top].next) {
                self.stack[top].next += 1;
                if self.select(node, choice) {
                    return true;
                }
                self.undo(mark);
            }

            tracing::trace!("Backtracking from {}", self.graph.nodes[node].name);
            self.blame(node, top + 1);
            self.stack.pop();
        }
        false
    }

    /// Select a release and narrow its dependencies. False if that leaves a
    /// dependency with no possible release.
    fn select(&mut self, id: usize, choice: usize) -> bool {
        let release = &self.graph.nodes[id].releases[choice];
        let label = release.to_string();
        let dependencies: Vec<(String, VersionRange)> = release
            .dependencies
            .iter()
            .map(|(name, range)| (name.clone(), range.clone()))
            .collect();

        tracing::trace!("Trying {label}");
        self.trail.push(Trail::Selected(id));
        self.graph.nodes[id].selected = Some(choice);

        let depth = self.stack.len() + 1;
        for (name, range) in dependencies {
            let Some(dep) = self.graph.node_id(&name) else {
                tracing::trace!("{label} depends on {name}, which was never discovered");
                return false;
            };

            let target = &mut self.graph.nodes[dep];
            let narrowed = match &target.effective {
                Some(current) => current.intersection(&range),
                None => range.clone(),
            };
            let previous = target.effective.replace(narrowed.clone());
            let dependents = target.dependents.len();
            target.dependents.push(Dependent {
                release: label.clone(),
                range,
            });
            let viable = match target.selected {
                Some(selected) => target.releases[selected].satisfies(&narrowed),
                None => target.releases.iter().any(|r| r.satisfies(&narrowed)),
            };
            self.trail.push(Trail::Narrowed {
                node: dep,
                previous,
                dependents,
            });

            if !viable {
                tracing::trace!("{label} leaves no release of {name} in {narrowed}");
                self.blame(dep, depth);
                return false;
            }
        }
        true
    }

    /// Pop the trail back to `mark`, restoring selections and ranges.
    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            match self.trail.pop() {
                Some(Trail::Selected(id)) => self.graph.nodes[id].selected = None,
                Some(Trail::Narrowed {
                    node,
                    previous,
                    dependents,
                }) => {
                    let node = &mut self.graph.nodes[node];
                    node.effective = previous;
                    node.dependents.truncate(dependents);
                }
                None => break,
            }
        }
    }

    /// Remember `id` as the cause of failure unless a deeper one is known.
    fn blame(&mut self, id: usize, depth: usize) {
        if self.dead_end.as_ref().is_some_and(|d| d.depth > depth) {
            return;
        }
        self.dead_end = Some(DeadEnd {
            depth,
            name: self.graph.nodes[id].name.clone(),
            detail: self.explain(id),
        });
    }

    /// What currently demands `id`, and what was on offer.
    fn explain(&self, id: usize) -> String {
        let node = &self.graph.nodes[id];
        let mut reasons = Vec::new();
        if let Some(requirement) = &node.requirement {
            reasons.push(format!("{} requested as {requirement}", node.name));
        }
        for dependent in &node.dependents {
            reasons.push(format!(
                "{} required as {} by {}",
                node.name, dependent.range, dependent.release
            ));
        }
        for constraint in self.graph.constraints.for_module(&node.name) {
            reasons.push(format!(
                "{} constrained by '{}' ({})",
                node.name,
                constraint.label(),
                constraint.description()
            ));
        }

        let available = if node.releases.is_empty() {
            "no releases available".to_string()
        } else {
            let mut versions: Vec<String> =
                node.releases.iter().map(|r| r.version.to_string()).collect();
            versions.dedup();
            format!("available: {}", versions.join(", "))
        };

        if reasons.is_empty() {
            available
        } else {
            format!("{}; {available}", reasons.join(", "))
        }
    }

    fn failure(&self) -> ModError {
        let (unsatisfied, mut detail) = match &self.dead_end {
            Some(dead_end) => (Some(dead_end.name.clone()), Some(dead_end.detail.clone())),
            None => (None, None),
        };
        if let Some(label) = &self.graph_rejection {
            let note = format!("graph constraint '{label}' rejected a complete selection");
            detail = Some(match detail {
                Some(detail) => format!("{detail}; {note}"),
                None => note,
            });
        }
        ModError::Unsatisfiable {
            modules: self.graph.roots().to_vec(),
            unsatisfied,
            detail,
        }
    }
}
