//! On-disk release index: a TOML list of releases with their dependency ranges.
//!
//! ```toml
//! [[release]]
//! name = "foo"
//! version = "1.1.0"
//!
//! [release.dependencies]
//! bar = "1.x"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use modsolve_util::errors::ModError;
use serde::{Deserialize, Serialize};

use crate::range::VersionRange;
use crate::version::Version;

/// A parsed release index document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseIndex {
    #[serde(default, rename = "release")]
    pub releases: Vec<IndexEntry>,
}

/// One published release in an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub version: Version,
    /// Dependency name to range expression.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl ReleaseIndex {
    /// Parse an index from TOML, validating every dependency range.
    pub fn parse_toml(content: &str) -> Result<Self, ModError> {
        let index: ReleaseIndex = toml::from_str(content).map_err(|e| ModError::Index {
            message: e.to_string(),
        })?;

        for entry in &index.releases {
            if entry.name.trim().is_empty() {
                return Err(ModError::Index {
                    message: format!("release {} has an empty name", entry.version),
                });
            }
            for (dep, expr) in &entry.dependencies {
                VersionRange::parse(expr).map_err(|e| ModError::Index {
                    message: format!(
                        "dependency '{dep}' of {} {}: {e}",
                        entry.name, entry.version
                    ),
                })?;
            }
        }
        Ok(index)
    }

    /// Read and parse an index file.
    pub fn load(path: &Path) -> Result<Self, ModError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModError::Index {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content)
    }

    /// Releases published under `name`, in document order.
    pub fn releases_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a IndexEntry> {
        self.releases.iter().filter(move |e| e.name == name)
    }

    pub fn to_toml_string(&self) -> Result<String, ModError> {
        toml::to_string_pretty(self).map_err(|e| ModError::Index {
            message: e.to_string(),
        })
    }
}
