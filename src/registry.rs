//! Task discovery and the task registry
//!
//! Task units live two levels deep under the tasks root. A unit file must be
//! named after the directory that holds it, so a task's name can be read off
//! the tree without opening any file:
//!
//! ```text
//! tasks/
//!   build/build.yml          -> "build"
//!   build/notes.yml          -> (ignored, name differs from directory)
//!   lib/compile/compile.yml  -> "lib/compile"
//!   app/watcher.yml          -> watcher "app"
//! ```

use crate::error::{DiscoveryError, Result, RunnerError};
use crate::BoxFuture;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// File extension of task and watcher units
pub const UNIT_EXTENSION: &str = "yml";

/// Fixed file name of watcher units
pub const WATCHER_FILE_NAME: &str = "watcher.yml";

/// Absolute path of a discovered unit file
pub type TaskLocation = PathBuf;

/// Patterns matching task-unit candidates, relative to the root
pub fn task_patterns() -> Vec<String> {
    vec![
        format!("*/*.{UNIT_EXTENSION}"),
        format!("*/*/*.{UNIT_EXTENSION}"),
    ]
}

/// Patterns matching watcher units, relative to the root
pub fn watcher_patterns() -> Vec<String> {
    vec![
        format!("*/{WATCHER_FILE_NAME}"),
        format!("*/*/{WATCHER_FILE_NAME}"),
    ]
}

/// Expands glob-style patterns below a base directory
pub trait PathExpander: Send + Sync {
    /// Return the matching files as paths relative to `base`
    fn expand(
        &self,
        patterns: &[String],
        base: &Path,
    ) -> BoxFuture<std::result::Result<Vec<PathBuf>, DiscoveryError>>;
}

/// [`PathExpander`] backed by the `glob` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobExpander;

impl PathExpander for GlobExpander {
    fn expand(
        &self,
        patterns: &[String],
        base: &Path,
    ) -> BoxFuture<std::result::Result<Vec<PathBuf>, DiscoveryError>> {
        let patterns = patterns.to_vec();
        let base = base.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || expand_blocking(&patterns, &base))
                .await
                .map_err(|e| DiscoveryError::Interrupted(e.to_string()))?
        })
    }
}

fn expand_blocking(
    patterns: &[String],
    base: &Path,
) -> std::result::Result<Vec<PathBuf>, DiscoveryError> {
    let metadata = fs::metadata(base).map_err(|source| DiscoveryError::Read {
        path: base.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory(base.to_path_buf()));
    }
    // Surface permission problems instead of an empty match set.
    fs::read_dir(base).map_err(|source| DiscoveryError::Read {
        path: base.to_path_buf(),
        source,
    })?;

    let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
    let mut found = BTreeSet::new();

    for pattern in patterns {
        let full_pattern = format!("{}/{}", escaped_base, pattern);
        let entries = glob::glob(&full_pattern).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        for entry in entries {
            let path = entry.map_err(|e| DiscoveryError::Read {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if !path.is_file() {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(base) {
                found.insert(relative.to_path_buf());
            }
        }
    }

    Ok(found.into_iter().collect())
}

/// Split a relative path into its normal components
fn segments(relative: &Path) -> Option<Vec<&str>> {
    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect()
}

/// Derive a task name from a unit path relative to the tasks root
///
/// Returns `None` when the file is not named after its parent directory or
/// does not sit one or two levels below the root.
pub fn task_name_for(relative: &Path) -> Option<String> {
    if relative.extension().and_then(|e| e.to_str()) != Some(UNIT_EXTENSION) {
        return None;
    }
    let stem = relative.file_stem()?.to_str()?;
    let parts = segments(relative)?;

    match parts.as_slice() {
        [dir, _file] if *dir == stem => Some(stem.to_string()),
        [group, dir, _file] if *dir == stem => Some(format!("{}/{}", group, stem)),
        _ => None,
    }
}

/// Derive a watcher name from a `watcher.yml` path relative to the root
pub fn watcher_name_for(relative: &Path) -> Option<String> {
    if relative.file_name()?.to_str()? != WATCHER_FILE_NAME {
        return None;
    }
    let parts = segments(relative)?;

    match parts.as_slice() {
        [dir, _file] => Some(dir.to_string()),
        [group, dir, _file] => Some(format!("{}/{}", group, dir)),
        _ => None,
    }
}

/// Run a path expansion and wrap failures with the scanned root
pub async fn scan(
    expander: &dyn PathExpander,
    patterns: &[String],
    root: &Path,
) -> Result<Vec<PathBuf>> {
    let mut paths = expander
        .expand(patterns, root)
        .await
        .map_err(|source| RunnerError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
    // Expanders make no ordering promise; keep naming deterministic.
    paths.sort();
    Ok(paths)
}

/// Immutable mapping from task name to unit location
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskLocation>,
}

impl TaskRegistry {
    /// Scan `root` and build the registry
    pub async fn discover(root: &Path, expander: &dyn PathExpander) -> Result<Self> {
        debug!(root = %root.display(), "collecting tasks");
        let paths = scan(expander, &task_patterns(), root).await?;
        let registry = Self::from_paths(root, &paths);
        debug!(count = registry.len(), "collected tasks");
        Ok(registry)
    }

    /// Build the registry from candidate paths relative to `root`
    ///
    /// Candidates are applied in the given order; on a name collision the
    /// later candidate replaces the earlier one.
    pub fn from_paths(root: &Path, relative_paths: &[PathBuf]) -> Self {
        let mut tasks = BTreeMap::new();
        for relative in relative_paths {
            let Some(name) = task_name_for(relative) else {
                continue;
            };
            let location = root.join(relative);
            if let Some(previous) = tasks.insert(name.clone(), location) {
                warn!(
                    task = %name,
                    replaced = %previous.display(),
                    "duplicate task name, keeping the later unit"
                );
            }
        }
        TaskRegistry { tasks }
    }

    /// Resolve a task name to its unit location
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.tasks.get(name).map(PathBuf::as_path)
    }

    /// All task names in lexical order
    pub fn names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
