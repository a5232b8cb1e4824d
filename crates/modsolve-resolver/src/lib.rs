//! Module dependency resolution: release discovery across sources, named
//! constraints, backtracking search for one release per module, and install
//! plans built from the result.

pub mod constraint;
pub mod graph;
pub mod plan;
pub mod resolver;
pub mod source;

pub use graph::{ModuleRelease, ReleaseGraph, SourceId};
pub use plan::InstallPlan;
pub use resolver::{resolve, resolve_with, ModuleResolver};
pub use source::{IndexSource, MemorySource, ReleaseDescriptor, Source};
