//! Execution context for task running
//!
//! Every invocation gets its own [`ExecutionContext`]: depth, options, a
//! depth-scoped identity and two handles that re-enter the engine. Units
//! receive it by value as their only input.

use crate::error::RunnerError;
use crate::input::ProcessInput;
use crate::runner::engine::{RunFuture, Runner};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::Span;

/// Depth of the initially requested task and of every watcher invocation
pub const TOP_LEVEL_DEPTH: usize = 1;

/// Identity used to namespace log output and watcher naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedIdentity {
    name: String,
    sub_name: Option<String>,
    depth: usize,
}

impl ScopedIdentity {
    /// Runner-level identity
    pub fn new(name: impl Into<String>) -> Self {
        ScopedIdentity {
            name: name.into(),
            sub_name: None,
            depth: TOP_LEVEL_DEPTH,
        }
    }

    /// Inherit this identity for one invocation
    pub fn scoped(&self, sub_name: &str, depth: usize) -> Self {
        ScopedIdentity {
            name: self.name.clone(),
            sub_name: Some(sub_name.to_string()),
            depth,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_name(&self) -> Option<&str> {
        self.sub_name.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Logging span carrying this identity's fields
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "task",
            runner = %self.name,
            task = self.sub_name.as_deref().unwrap_or("-"),
            depth = self.depth
        )
    }
}

impl fmt::Display for ScopedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_name {
            Some(sub_name) => write!(f, "{}:{}@{}", self.name, sub_name, self.depth),
            None => write!(f, "{}@{}", self.name, self.depth),
        }
    }
}

/// Per-invocation context handed to a unit
pub struct ExecutionContext {
    runner: Arc<Runner>,
    task_name: String,
    depth: usize,
    options: Value,
    identity: ScopedIdentity,
    span: Span,
}

impl ExecutionContext {
    /// Build the context for one invocation
    ///
    /// Missing or `null` options become an empty mapping.
    pub fn new(
        runner: Arc<Runner>,
        task_name: impl Into<String>,
        depth: usize,
        options: Option<Value>,
    ) -> Self {
        let task_name = task_name.into();
        let identity = runner.identity().scoped(&task_name, depth);
        let span = identity.span();
        let options = match options {
            None | Some(Value::Null) => Value::Mapping(Mapping::new()),
            Some(options) => options,
        };

        ExecutionContext {
            runner,
            task_name,
            depth,
            options,
            identity,
            span,
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Options supplied by the caller
    pub fn options(&self) -> &Value {
        &self.options
    }

    /// A single option, when the options are a mapping
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.as_mapping().and_then(|map| map.get(key))
    }

    pub fn identity(&self) -> &ScopedIdentity {
        &self.identity
    }

    /// Span all of this invocation's log output belongs to
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn storage_value(&self, key: &str) -> Option<Value> {
        self.runner.value(key)
    }

    pub fn set_storage_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.runner.set_value(key, value);
    }

    pub fn user_input_value(&self, key: &str) -> Option<Value> {
        self.runner.user_input_value(key)
    }

    pub fn process_input(&self) -> &ProcessInput {
        self.runner.process_input()
    }

    pub fn working_dir(&self) -> &Path {
        &self.runner.settings().working_dir
    }

    pub fn interpreter(&self) -> &[String] {
        &self.runner.settings().interpreter
    }

    /// Run another task at this invocation's depth
    pub fn run_task(&self, name: &str, options: Option<Value>) -> RunFuture {
        self.reenter("runTask", name, self.depth, options)
    }

    /// Run another task one level deeper
    pub fn run_child_task(&self, name: &str, options: Option<Value>) -> RunFuture {
        self.reenter("runChildTask", name, self.depth + 1, options)
    }

    fn reenter(
        &self,
        call: &'static str,
        name: &str,
        depth: usize,
        options: Option<Value>,
    ) -> RunFuture {
        let runner = Arc::clone(&self.runner);
        let task = name.to_string();
        let caller = self.identity.to_string();

        Box::pin(async move {
            runner
                .execute(task.clone(), depth, options)
                .await
                .map_err(|source| RunnerError::Invocation {
                    call,
                    task,
                    caller,
                    source: Box::new(source),
                })
        })
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("identity", &self.identity)
            .field("options", &self.options)
            .finish()
    }
}
