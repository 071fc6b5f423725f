//! Runtime task representation and execution
//!
//! This differs from [`crate::unit::file::TaskFile`] by flattening the loose
//! on-disk shapes (single values vs lists, bare strings vs detailed items)
//! into one form the interpreter walks.

use crate::error::Result;
use crate::runner::ExecutionContext;
use crate::unit::command::execute_command;
use crate::unit::file::{self, RunEntry, TaskFile};
use crate::unit::scope::Scope;
use crate::unit::when::evaluate_when_list;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Runtime task representation
#[derive(Debug, Clone, Default)]
pub struct Task {
    /// Usage description
    pub usage: Option<String>,

    /// Longer description
    pub description: Option<String>,

    /// Run items to execute
    pub run: Vec<Run>,

    /// Finally block
    pub finally: Vec<Run>,

    /// Result value template
    pub result: Option<Value>,
}

impl Task {
    /// Create a task from a unit file
    pub fn from_file(file: TaskFile) -> Self {
        Task {
            usage: file.usage,
            description: file.description,
            run: file.run.into_iter().map(Run::from_entry).collect(),
            finally: file.finally.into_iter().map(Run::from_entry).collect(),
            result: file.result,
        }
    }

    /// Create a bare task from run entries (used for watcher callbacks)
    pub fn from_entries(entries: Vec<RunEntry>) -> Self {
        Task {
            run: entries.into_iter().map(Run::from_entry).collect(),
            ..Task::default()
        }
    }

    /// Execute the task with the given context
    ///
    /// `finally` items always run; if `run` succeeded but `finally` failed,
    /// the `finally` error is returned, otherwise the `run` error wins.
    pub async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let mut scope = Scope::new(ctx);

        let result = execute_items(&self.run, &mut scope).await;

        if !self.finally.is_empty() {
            debug!("running finally block");
            if let Err(e) = execute_items(&self.finally, &mut scope).await {
                if result.is_ok() {
                    return Err(e);
                }
            }
        }

        result?;

        match &self.result {
            Some(template) => Ok(scope.interpolate_value(template)?),
            None => Ok(Value::Null),
        }
    }
}

async fn execute_items(items: &[Run], scope: &mut Scope<'_>) -> Result<()> {
    for run in items {
        execute_run_item(run, scope).await?;
    }
    Ok(())
}

/// Execute a single run item
///
/// Within an item: environment and store writes first, then commands, then
/// child tasks, then peer tasks.
async fn execute_run_item(run: &Run, scope: &mut Scope<'_>) -> Result<()> {
    if !run.when.is_empty() && !evaluate_when_list(&run.when, scope).await? {
        return Ok(());
    }

    for (key, value) in &run.set_environment {
        let value = match value {
            Some(v) => Some(scope.interpolate(v)?),
            None => None,
        };
        scope.set_env(key.clone(), value);
    }

    for (key, value) in &run.set_values {
        let value = scope.interpolate_value(value)?;
        scope.ctx().set_storage_value(key.clone(), value);
    }

    for cmd in &run.commands {
        execute_command(cmd, scope).await?;
    }

    for call in &run.children {
        let (name, options) = call.resolve(scope)?;
        scope.ctx().run_child_task(&name, options).await?;
    }

    for call in &run.peers {
        let (name, options) = call.resolve(scope)?;
        scope.ctx().run_task(&name, options).await?;
    }

    Ok(())
}

/// Runtime representation of a run item
#[derive(Debug, Clone, Default)]
pub struct Run {
    /// Conditions that must be met
    pub when: Vec<When>,

    /// Commands to execute
    pub commands: Vec<Command>,

    /// Tasks run one level deeper
    pub children: Vec<TaskCall>,

    /// Tasks run at the same depth
    pub peers: Vec<TaskCall>,

    /// Invocation environment changes
    pub set_environment: BTreeMap<String, Option<String>>,

    /// Configuration store writes
    pub set_values: BTreeMap<String, Value>,
}

impl Run {
    /// Create from a file entry
    pub fn from_entry(entry: RunEntry) -> Self {
        match entry {
            RunEntry::SimpleCommand(cmd) => Run {
                commands: vec![Command::Simple(cmd)],
                ..Run::default()
            },
            RunEntry::Complex(item) => Run {
                when: item.when.into_iter().map(When::from_file).collect(),
                commands: item.command.into_iter().map(Command::from_file).collect(),
                children: item.task.into_iter().map(TaskCall::from_file).collect(),
                peers: item.run_task.into_iter().map(TaskCall::from_file).collect(),
                set_environment: item.set_environment,
                set_values: item.set_value,
            },
        }
    }
}

/// Runtime representation of a command
#[derive(Debug, Clone)]
pub enum Command {
    /// Simple command string
    Simple(String),

    /// Complex command with options
    Complex {
        exec: String,
        print: String,
        quiet: bool,
        dir: Option<String>,
    },
}

impl Command {
    pub fn from_file(entry: file::CommandEntry) -> Self {
        match entry {
            file::CommandEntry::Simple(cmd) => Command::Simple(cmd),
            file::CommandEntry::Complex(detail) => Command::Complex {
                print: detail.print.unwrap_or_else(|| detail.exec.clone()),
                exec: detail.exec,
                quiet: detail.quiet,
                dir: detail.dir,
            },
        }
    }

    /// Get the command to execute
    pub fn exec(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex { exec, .. } => exec,
        }
    }

    /// Get what to print
    pub fn print(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex { print, .. } => print,
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Command::Complex { quiet: true, .. })
    }

    pub fn dir(&self) -> Option<&str> {
        match self {
            Command::Simple(_) => None,
            Command::Complex { dir, .. } => dir.as_deref(),
        }
    }
}

/// Runtime representation of a task reference
#[derive(Debug, Clone)]
pub struct TaskCall {
    pub name: String,
    pub options: BTreeMap<String, Value>,
}

impl TaskCall {
    pub fn from_file(call: file::TaskCall) -> Self {
        match call {
            file::TaskCall::Simple(name) => TaskCall {
                name,
                options: BTreeMap::new(),
            },
            file::TaskCall::Complex(detail) => TaskCall {
                name: detail.name,
                options: detail.options,
            },
        }
    }

    /// Interpolate the name and options against the calling scope
    fn resolve(&self, scope: &Scope<'_>) -> Result<(String, Option<Value>)> {
        let name = scope.interpolate(&self.name)?;
        if self.options.is_empty() {
            return Ok((name, None));
        }

        let mut options = Mapping::new();
        for (key, value) in &self.options {
            options.insert(Value::from(key.clone()), scope.interpolate_value(value)?);
        }
        Ok((name, Some(Value::Mapping(options))))
    }
}

/// Runtime representation of a when condition
#[derive(Debug, Clone)]
pub struct When {
    pub condition: WhenCondition,
}

impl When {
    pub fn from_file(config: file::When) -> Self {
        let condition = if let Some(eq) = config.equal {
            WhenCondition::Equal {
                left: eq.left,
                right: eq.right,
            }
        } else if let Some(ne) = config.not_equal {
            WhenCondition::NotEqual {
                left: ne.left,
                right: ne.right,
            }
        } else if let Some(cmd) = config.command {
            WhenCondition::Command(cmd)
        } else if let Some(path) = config.exists {
            WhenCondition::Exists(path)
        } else if let Some(var) = config.env_set {
            WhenCondition::EnvSet(var)
        } else if let Some(var) = config.env_not_set {
            WhenCondition::EnvNotSet(var)
        } else if let Some(opt) = config.option_set {
            WhenCondition::OptionSet(opt)
        } else if let Some(opt) = config.option_not_set {
            WhenCondition::OptionNotSet(opt)
        } else if let Some(key) = config.value_set {
            WhenCondition::ValueSet(key)
        } else {
            WhenCondition::Always
        };

        When { condition }
    }
}

/// Types of when conditions
#[derive(Debug, Clone)]
pub enum WhenCondition {
    Equal { left: String, right: String },
    NotEqual { left: String, right: String },
    Command(String),
    Exists(String),
    EnvSet(String),
    EnvNotSet(String),
    OptionSet(String),
    OptionNotSet(String),
    ValueSet(String),
    Always,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Task {
        Task::from_file(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_from_file_flattens_items() {
        let task = parse(
            r#"
usage: Release
run:
  - echo one
  - command: [echo two, {exec: echo three, print: three, quiet: true}]
    task: child
    run-task: {name: peer, options: {mode: fast}}
finally: echo cleanup
"#,
        );

        assert_eq!(task.usage.as_deref(), Some("Release"));
        assert_eq!(task.run.len(), 2);
        assert_eq!(task.run[0].commands[0].exec(), "echo one");

        let second = &task.run[1];
        assert_eq!(second.commands.len(), 2);
        assert!(!second.commands[0].is_quiet());
        assert!(second.commands[1].is_quiet());
        assert_eq!(second.commands[1].print(), "three");
        assert_eq!(second.children[0].name, "child");
        assert_eq!(second.peers[0].name, "peer");
        assert_eq!(
            second.peers[0].options.get("mode"),
            Some(&Value::from("fast"))
        );
        assert_eq!(task.finally.len(), 1);
    }

    #[test]
    fn test_when_condition_kinds() {
        let task = parse(
            r#"
run:
  - when:
      - value-set: region
      - option-not-set: dry-run
      - {}
    command: echo ok
"#,
        );

        let when = &task.run[0].when;
        assert!(matches!(when[0].condition, WhenCondition::ValueSet(ref k) if k == "region"));
        assert!(matches!(when[1].condition, WhenCondition::OptionNotSet(_)));
        assert!(matches!(when[2].condition, WhenCondition::Always));
    }

    #[test]
    fn test_from_entries_has_no_finally() {
        let task = Task::from_entries(vec![RunEntry::SimpleCommand("true".to_string())]);
        assert_eq!(task.run.len(), 1);
        assert!(task.finally.is_empty());
        assert!(task.result.is_none());
    }
}
