//! Release sources: anything that can list the published releases of a module.

use std::collections::BTreeMap;
use std::path::Path;

use modsolve_core::index::{IndexEntry, ReleaseIndex};
use modsolve_core::version::Version;
use modsolve_util::errors::ModError;

/// A provider of releases, queried by module name.
///
/// `fetch` is called at most once per name while a release graph is built.
/// Descriptors for other names are ignored.
pub trait Source: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn label(&self) -> &str;

    /// Releases from higher-priority sources win ties on equal versions.
    fn priority(&self) -> i32 {
        0
    }

    fn fetch(&self, name: &str) -> miette::Result<Vec<ReleaseDescriptor>>;
}

/// An unresolved release as a source reports it. Dependency ranges stay as
/// text until the graph parses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub name: String,
    pub version: Version,
    pub dependencies: BTreeMap<String, String>,
}

impl ReleaseDescriptor {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }
}

impl From<IndexEntry> for ReleaseDescriptor {
    fn from(entry: IndexEntry) -> Self {
        Self {
            name: entry.name,
            version: entry.version,
            dependencies: entry.dependencies,
        }
    }
}

/// Releases held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    priority: i32,
    releases: Vec<ReleaseDescriptor>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn add(&mut self, release: ReleaseDescriptor) {
        self.releases.push(release);
    }

    /// Add a release from its textual version and `(dependency, range)` pairs.
    pub fn publish(
        &mut self,
        name: &str,
        version: &str,
        dependencies: &[(&str, &str)],
    ) -> Result<&mut Self, ModError> {
        let mut release = ReleaseDescriptor::new(name, Version::parse(version)?);
        for (dep, range) in dependencies {
            release = release.with_dependency(*dep, *range);
        }
        self.add(release);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

impl Source for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn fetch(&self, name: &str) -> miette::Result<Vec<ReleaseDescriptor>> {
        Ok(self
            .releases
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }
}

/// Releases listed in a TOML release index.
#[derive(Debug, Clone)]
pub struct IndexSource {
    label: String,
    priority: i32,
    index: ReleaseIndex,
}

impl IndexSource {
    pub fn new(label: impl Into<String>, index: ReleaseIndex) -> Self {
        Self {
            label: label.into(),
            priority: 0,
            index,
        }
    }

    pub fn from_toml_str(label: impl Into<String>, content: &str) -> Result<Self, ModError> {
        Ok(Self::new(label, ReleaseIndex::parse_toml(content)?))
    }

    pub fn from_path(label: impl Into<String>, path: &Path) -> Result<Self, ModError> {
        Ok(Self::new(label, ReleaseIndex::load(path)?))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn index(&self) -> &ReleaseIndex {
        &self.index
    }
}

impl Source for IndexSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn fetch(&self, name: &str) -> miette::Result<Vec<ReleaseDescriptor>> {
        Ok(self
            .index
            .releases_named(name)
            .cloned()
            .map(ReleaseDescriptor::from)
            .collect())
    }
}
