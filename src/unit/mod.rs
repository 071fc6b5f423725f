//! Task and watcher units
//!
//! A unit is something invocable with an [`ExecutionContext`]: task units
//! return a result value, watcher units return a raw watcher descriptor.
//! Units normally come from YAML files through [`YamlLoader`]; programs
//! embedding the runner can also supply Rust closures via [`task_fn`] and
//! [`watcher_fn`].

pub mod command;
pub mod file;
pub mod interpolate;
pub mod loader;
pub mod scope;
pub mod task;
pub mod when;

pub use file::{run_entries_from_value, RunEntry, TaskFile};
pub use interpolate::interpolate;
pub use loader::{MemoryLoader, YamlLoader, YamlTask, YamlWatcher};
pub use scope::{value_to_string, Scope};
pub use task::Task;

use crate::error::Result;
use crate::runner::ExecutionContext;
use crate::BoxFuture;
use serde_yaml::Value;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// A loadable unit of work
pub trait TaskUnit: Send + Sync {
    /// Run the unit; the context is its only input
    fn invoke(self: Arc<Self>, ctx: ExecutionContext) -> BoxFuture<Result<Value>>;

    /// One-line description for task listings
    fn usage(&self) -> Option<String> {
        None
    }

    /// Longer description, shown in verbose listings
    fn description(&self) -> Option<String> {
        None
    }
}

/// A loadable unit that declares what to watch
pub trait WatcherUnit: Send + Sync {
    /// Produce the raw descriptor (`paths` and `events`), validated by the caller
    fn invoke(self: Arc<Self>, ctx: ExecutionContext) -> BoxFuture<Result<Value>>;
}

/// Turns a resolved location into an invocable unit
pub trait UnitLoader: Send + Sync {
    fn load_task(&self, location: &Path) -> BoxFuture<Result<Arc<dyn TaskUnit>>>;

    fn load_watcher(&self, location: &Path) -> BoxFuture<Result<Arc<dyn WatcherUnit>>>;
}

/// Task unit wrapping an async closure
pub struct FnTask<F> {
    body: F,
    usage: Option<String>,
}

impl<F> FnTask<F> {
    /// Attach a usage line
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }
}

impl<F, Fut> TaskUnit for FnTask<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn invoke(self: Arc<Self>, ctx: ExecutionContext) -> BoxFuture<Result<Value>> {
        Box::pin((self.body)(ctx))
    }

    fn usage(&self) -> Option<String> {
        self.usage.clone()
    }
}

/// Build a task unit from an async closure
pub fn task_fn<F, Fut>(body: F) -> FnTask<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    FnTask { body, usage: None }
}

/// Watcher unit wrapping an async closure
pub struct FnWatcher<F> {
    body: F,
}

impl<F, Fut> WatcherUnit for FnWatcher<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn invoke(self: Arc<Self>, ctx: ExecutionContext) -> BoxFuture<Result<Value>> {
        Box::pin((self.body)(ctx))
    }
}

/// Build a watcher unit from an async closure
pub fn watcher_fn<F, Fut>(body: F) -> FnWatcher<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    FnWatcher { body }
}
