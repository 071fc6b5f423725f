//! On-disk unit file types
//!
//! These mirror a task unit YAML file one to one; [`crate::unit::task`] turns
//! them into the runtime representation.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A task unit file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    /// Usage description shown by `--list`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Run items to execute
    #[serde(default, deserialize_with = "one_or_many")]
    pub run: Vec<RunEntry>,

    /// Finally block - always executes, even on error
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub finally: Vec<RunEntry>,

    /// Value returned to the caller; strings inside are interpolated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// A run item - a bare command or a full item
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RunEntry {
    /// Simple string command
    SimpleCommand(String),

    /// Complex run item with conditionals and multiple actions
    Complex(RunItem),
}

/// A complex run item with conditions and actions
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunItem {
    /// Conditions that must all hold for this item to run
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub when: Vec<When>,

    /// Commands to execute
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub command: Vec<CommandEntry>,

    /// Child tasks, run one level deeper
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub task: Vec<TaskCall>,

    /// Peer tasks, run at the caller's own depth
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub run_task: Vec<TaskCall>,

    /// Environment for this invocation's commands; `null` unsets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_environment: BTreeMap<String, Option<String>>,

    /// Values written to the configuration store
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_value: BTreeMap<String, Value>,
}

/// A command to execute
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CommandEntry {
    /// Simple string command
    Simple(String),

    /// Complex command with additional options
    Complex(CommandDetail),
}

/// Detailed command specification
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandDetail {
    /// The command to execute
    pub exec: String,

    /// What to print when running (defaults to exec)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print: Option<String>,

    /// Whether to suppress the command echo
    #[serde(default)]
    pub quiet: bool,

    /// Working directory, relative to the runner's working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// A reference to another task
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TaskCall {
    /// Simple task name
    Simple(String),

    /// Task name with options
    Complex(TaskCallDetail),
}

/// Task reference with options
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCallDetail {
    /// Name of the task to run
    pub name: String,

    /// Options passed to the task; strings are interpolated first
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

/// A conditional expression
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct When {
    /// Check if values are equal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equal: Option<WhenComparison>,

    /// Check if values are not equal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equal: Option<WhenComparison>,

    /// Check if a command succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Check if a path exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,

    /// Check if environment variable is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_set: Option<String>,

    /// Check if environment variable is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_not_set: Option<String>,

    /// Check if an option was passed to this invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_set: Option<String>,

    /// Check if an option was not passed to this invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_not_set: Option<String>,

    /// Check if the configuration store holds a key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
}

/// A comparison for when conditions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhenComparison {
    /// Left-hand side of comparison
    pub left: String,

    /// Right-hand side of comparison
    pub right: String,
}

/// Parse run items from a loose YAML value (a string, an item, or a list)
pub fn run_entries_from_value(value: Value) -> Result<Vec<RunEntry>, serde_yaml::Error> {
    one_or_many(value)
}

/// Accept `null`, a single value, or a sequence of values
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| serde_yaml::from_value(item).map_err(D::Error::custom))
            .collect(),
        single => serde_yaml::from_value(single)
            .map(|item| vec![item])
            .map_err(D::Error::custom),
    }
}
