//! Resolved runner settings
//!
//! A [`Config`] is what the operator wrote; [`Settings`] is what the runner
//! uses: every path absolute, every default filled in.

use crate::config::schema::validate_config;
use crate::config::types::{Config, WatchConfig};
use crate::error::{ConfigError, ConfigResult};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Runner name used when the config does not set one
pub const DEFAULT_NAME: &str = "dirrun";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of every scoped identity
    pub name: String,

    /// Tasks root directory
    pub tasks_path: PathBuf,

    /// Watchers root directory
    pub watchers_path: PathBuf,

    /// Directory commands run in and relative watch paths resolve against
    pub working_dir: PathBuf,

    /// Interpreter for shell commands
    pub interpreter: Vec<String>,

    /// Initial configuration store contents
    pub values: BTreeMap<String, Value>,

    /// Operator watch overrides
    pub watch: WatchConfig,
}

impl Settings {
    /// Settings for a tasks root, everything else defaulted
    pub fn new(tasks_path: impl Into<PathBuf>) -> Self {
        let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let tasks_path = absolutize(&working_dir, &tasks_path.into());

        Settings {
            name: DEFAULT_NAME.to_string(),
            watchers_path: tasks_path.clone(),
            tasks_path,
            working_dir,
            interpreter: default_interpreter(),
            values: BTreeMap::new(),
            watch: WatchConfig::default(),
        }
    }

    /// Resolve a parsed config; relative paths are taken from `config_path`'s directory
    pub fn from_config(config: Config, config_path: Option<&Path>) -> ConfigResult<Self> {
        validate_config(&config)?;

        let working_dir = match config_path.and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => absolutize(&current_dir()?, dir),
            _ => current_dir()?,
        };

        let tasks_path = config
            .tasks_path
            .as_deref()
            .map(|p| absolutize(&working_dir, p))
            .ok_or(ConfigError::MissingTasksPath)?;
        let watchers_path = config
            .watchers_path
            .as_deref()
            .map(|p| absolutize(&working_dir, p))
            .unwrap_or_else(|| tasks_path.clone());

        Ok(Settings {
            name: config.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            tasks_path,
            watchers_path,
            working_dir,
            interpreter: config.interpreter.unwrap_or_else(default_interpreter),
            values: config.values,
            watch: config.watch,
        })
    }

    /// Set the runner name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the watchers root
    pub fn with_watchers_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.watchers_path = absolutize(&self.working_dir, &path.into());
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set a single initial store value
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set the watch overrides
    pub fn with_watch(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    /// Values the configuration store starts with
    ///
    /// The configured values plus the resolved name and paths, so tasks can
    /// read them back like any other setting.
    pub fn store_values(&self) -> Vec<(String, Value)> {
        let mut values: Vec<(String, Value)> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        values.push(("name".to_string(), Value::from(self.name.clone())));
        values.push(("tasks-path".to_string(), path_value(&self.tasks_path)));
        values.push(("watchers-path".to_string(), path_value(&self.watchers_path)));
        values
    }
}

fn default_interpreter() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string()]
}

fn current_dir() -> ConfigResult<PathBuf> {
    env::current_dir()
        .map_err(|e| ConfigError::Invalid(format!("Failed to get current directory: {}", e)))
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn path_value(path: &Path) -> Value {
    Value::from(path.display().to_string())
}
