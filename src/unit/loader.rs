//! Unit loaders
//!
//! [`YamlLoader`] reads unit files from disk. [`MemoryLoader`] lets an
//! embedding program register units written in Rust for specific
//! locations, falling back to YAML for everything else.

use crate::error::{Result, UnitError, UnitResult};
use crate::runner::ExecutionContext;
use crate::unit::scope::Scope;
use crate::unit::task::Task;
use crate::unit::file::TaskFile;
use crate::unit::{TaskUnit, UnitLoader, WatcherUnit};
use crate::BoxFuture;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loads task and watcher units from YAML files
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlLoader;

impl UnitLoader for YamlLoader {
    fn load_task(&self, location: &Path) -> BoxFuture<Result<Arc<dyn TaskUnit>>> {
        let location = location.to_path_buf();
        Box::pin(async move {
            let file: TaskFile = read_unit(&location).await?;
            Ok(Arc::new(YamlTask::new(Task::from_file(file))) as Arc<dyn TaskUnit>)
        })
    }

    fn load_watcher(&self, location: &Path) -> BoxFuture<Result<Arc<dyn WatcherUnit>>> {
        let location = location.to_path_buf();
        Box::pin(async move {
            let document: Value = read_unit(&location).await?;
            Ok(Arc::new(YamlWatcher { document }) as Arc<dyn WatcherUnit>)
        })
    }
}

async fn read_unit<T: DeserializeOwned>(path: &Path) -> UnitResult<T> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| UnitError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    // An empty file is an empty document, not a syntax error.
    let contents = if contents.trim().is_empty() {
        "{}"
    } else {
        contents.as_str()
    };

    serde_yaml::from_str(contents).map_err(|source| UnitError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A task unit backed by a parsed YAML file
#[derive(Debug)]
pub struct YamlTask {
    task: Task,
}

impl YamlTask {
    pub fn new(task: Task) -> Self {
        YamlTask { task }
    }
}

impl TaskUnit for YamlTask {
    fn invoke(self: Arc<Self>, ctx: ExecutionContext) -> BoxFuture<Result<Value>> {
        Box::pin(async move { self.task.execute(&ctx).await })
    }

    fn usage(&self) -> Option<String> {
        self.task.usage.clone()
    }

    fn description(&self) -> Option<String> {
        self.task.description.clone()
    }
}

/// A watcher unit backed by a YAML document
///
/// Invoking it returns the document with `paths` entries interpolated
/// against the watcher's context; everything else is returned as written.
#[derive(Debug)]
pub struct YamlWatcher {
    document: Value,
}

impl WatcherUnit for YamlWatcher {
    fn invoke(self: Arc<Self>, ctx: ExecutionContext) -> BoxFuture<Result<Value>> {
        Box::pin(async move {
            let mut document = self.document.clone();
            if let Some(paths) = document.get_mut("paths") {
                let scope = Scope::new(&ctx);
                *paths = scope.interpolate_value(paths)?;
            }
            Ok(document)
        })
    }
}

/// Units registered in memory by location, YAML files otherwise
#[derive(Default, Clone)]
pub struct MemoryLoader {
    tasks: HashMap<PathBuf, Arc<dyn TaskUnit>>,
    watchers: HashMap<PathBuf, Arc<dyn WatcherUnit>>,
    fallback: YamlLoader,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task unit for a location
    pub fn with_task(mut self, location: impl Into<PathBuf>, unit: Arc<dyn TaskUnit>) -> Self {
        self.tasks.insert(location.into(), unit);
        self
    }

    /// Register a watcher unit for a location
    pub fn with_watcher(
        mut self,
        location: impl Into<PathBuf>,
        unit: Arc<dyn WatcherUnit>,
    ) -> Self {
        self.watchers.insert(location.into(), unit);
        self
    }
}

impl UnitLoader for MemoryLoader {
    fn load_task(&self, location: &Path) -> BoxFuture<Result<Arc<dyn TaskUnit>>> {
        match self.tasks.get(location) {
            Some(unit) => {
                let unit = Arc::clone(unit);
                Box::pin(async move { Ok(unit) })
            }
            None => self.fallback.load_task(location),
        }
    }

    fn load_watcher(&self, location: &Path) -> BoxFuture<Result<Arc<dyn WatcherUnit>>> {
        match self.watchers.get(location) {
            Some(unit) => {
                let unit = Arc::clone(unit);
                Box::pin(async move { Ok(unit) })
            }
            None => self.fallback.load_watcher(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_task_reads_usage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("build.yml");
        fs::write(
            &path,
            "usage: Build it\ndescription: Compiles every crate\nrun: echo build\n",
        )
        .unwrap();

        let unit = YamlLoader.load_task(&path).await.unwrap();
        assert_eq!(unit.usage().as_deref(), Some("Build it"));
        assert_eq!(unit.description().as_deref(), Some("Compiles every crate"));
    }

    #[tokio::test]
    async fn test_load_empty_task_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("noop.yml");
        fs::write(&path, "\n").unwrap();

        let unit = YamlLoader.load_task(&path).await.unwrap();
        assert_eq!(unit.usage(), None);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = YamlLoader.load_task(&temp_dir.path().join("gone.yml")).await;
        assert!(matches!(
            result,
            Err(crate::error::RunnerError::Unit(UnitError::Read { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_malformed_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yml");
        fs::write(&path, "run: [unterminated\n").unwrap();

        let result = YamlLoader.load_task(&path).await;
        assert!(matches!(
            result,
            Err(crate::error::RunnerError::Unit(UnitError::Parse { .. }))
        ));
    }
}
