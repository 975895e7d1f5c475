use crate::config::Pattern;
use crate::error::ConfigError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Exclusion filter applied by the watcher before events reach intake.
/// Patterns match the path relative to the watched root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    exclude: GlobSet,
}

impl PathFilter {
    /// Build a filter from a pattern list. An empty list lets everything through.
    pub fn new(root: impl Into<PathBuf>, exclude: &[Pattern]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pat in exclude {
            let glob = Glob::new(&pat.0)
                .map_err(|e| ConfigError::Invalid(format!("bad exclude pattern '{}': {e}", pat.0)))?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("bad exclude patterns: {e}")))?;
        Ok(Self { root: root.into(), exclude })
    }

    /// Determine whether a given path should be synced.
    pub fn check<P: AsRef<Path>>(&self, path: P) -> bool {
        if self.exclude.is_empty() {
            return true;
        }
        let path = path.as_ref();
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        !self.exclude.is_match(rel)
    }
}
