//! Named predicates that can veto a single release or a complete selection.

use std::collections::HashMap;
use std::fmt;

use crate::graph::ModuleRelease;

type ModulePredicate = Box<dyn Fn(&ModuleRelease) -> bool + Send + Sync>;
type GraphPredicate = Box<dyn Fn(&[&ModuleRelease]) -> bool + Send + Sync>;

/// A predicate every candidate release of one module must pass.
pub struct ModuleConstraint {
    label: String,
    description: String,
    predicate: ModulePredicate,
}

impl ModuleConstraint {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Free text explaining the constraint, usually the range it enforces.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn admits(&self, release: &ModuleRelease) -> bool {
        (self.predicate)(release)
    }
}

impl fmt::Debug for ModuleConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConstraint")
            .field("label", &self.label)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A predicate over every selected release at once.
pub struct GraphConstraint {
    label: String,
    predicate: GraphPredicate,
}

impl GraphConstraint {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn admits(&self, selection: &[&ModuleRelease]) -> bool {
        (self.predicate)(selection)
    }
}

impl fmt::Debug for GraphConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConstraint")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Every constraint registered on a release graph.
#[derive(Debug, Default)]
pub struct ConstraintSet {
    modules: HashMap<String, Vec<ModuleConstraint>>,
    graph: Vec<GraphConstraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module<F>(
        &mut self,
        label: impl Into<String>,
        module: impl Into<String>,
        description: impl Into<String>,
        predicate: F,
    ) where
        F: Fn(&ModuleRelease) -> bool + Send + Sync + 'static,
    {
        self.modules
            .entry(module.into())
            .or_default()
            .push(ModuleConstraint {
                label: label.into(),
                description: description.into(),
                predicate: Box::new(predicate),
            });
    }

    pub fn add_graph<F>(&mut self, label: impl Into<String>, predicate: F)
    where
        F: Fn(&[&ModuleRelease]) -> bool + Send + Sync + 'static,
    {
        self.graph.push(GraphConstraint {
            label: label.into(),
            predicate: Box::new(predicate),
        });
    }

    /// Constraints on `module`, in registration order.
    pub fn for_module(&self, module: &str) -> &[ModuleConstraint] {
        self.modules.get(module).map_or(&[][..], Vec::as_slice)
    }

    pub fn graph_constraints(&self) -> &[GraphConstraint] {
        &self.graph
    }

    /// The first module constraint that rejects `release`, if any.
    pub fn rejecting(&self, release: &ModuleRelease) -> Option<&ModuleConstraint> {
        self.for_module(&release.name)
            .iter()
            .find(|c| !c.admits(release))
    }

    /// The first graph constraint that rejects `selection`, if any.
    pub fn rejecting_selection(&self, selection: &[&ModuleRelease]) -> Option<&GraphConstraint> {
        self.graph.iter().find(|c| !c.admits(selection))
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.graph.is_empty()
    }
}
