use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use modsolve_util::errors::ModError;

/// Resolver configuration, usually loaded from `modsolve.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub resolver: SolverSettings,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,

    /// Directory of the file this config was loaded from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Search settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Only consider prereleases when no stable release fits a range.
    #[serde(default = "default_prefer_stable", rename = "prefer-stable")]
    pub prefer_stable: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            prefer_stable: default_prefer_stable(),
        }
    }
}

fn default_prefer_stable() -> bool {
    true
}

/// A release index registered as a source, from `[[sources]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub label: String,
    pub index: PathBuf,
    #[serde(default)]
    pub priority: i32,
}

impl ResolverConfig {
    pub const FILE_NAME: &'static str = "modsolve.toml";

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("No resolver config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ModError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let mut config = Self::parse_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ModError> {
        toml::from_str(content).map_err(|e| ModError::Config {
            message: format!("Failed to parse resolver config: {e}"),
        })
    }

    /// The index path of `entry`, resolved against the config file's directory.
    pub fn index_path(&self, entry: &SourceEntry) -> PathBuf {
        match &self.base_dir {
            Some(base) if entry.index.is_relative() => base.join(&entry.index),
            _ => entry.index.clone(),
        }
    }
}
