//! Core configuration types
//!
//! This module defines the data structures that represent a dirrun.yml configuration file.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Runner name, used as the root of every scoped identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Application usage description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Directory holding the task units (relative to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_path: Option<PathBuf>,

    /// Directory holding the watcher units, defaults to `tasks-path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchers_path: Option<PathBuf>,

    /// Global interpreter to use for commands (e.g., ["sh", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Initial contents of the configuration store
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Value>,

    /// Operator overrides for filesystem watching
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Watch settings as written by the operator; unset fields keep engine defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchConfig {
    /// Glob patterns of paths whose events are dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<Vec<String>>,

    /// Keep the process alive while watching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,

    /// Poll the filesystem instead of using native notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_polling: Option<bool>,

    /// Polling interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}
