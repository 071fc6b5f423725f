//! Task execution engine
//!
//! The [`Runner`] owns everything shared by all invocations: settings, the
//! two key-value stores, the lazily built task registry, the unit loader and
//! the watcher subsystem. Every invocation goes through
//! [`Runner::execute`], including nested ones made from a context.

use crate::config::Settings;
use crate::error::{Result, RunnerError};
use crate::input::ProcessInput;
use crate::registry::{GlobExpander, PathExpander, TaskRegistry};
use crate::runner::context::{ExecutionContext, ScopedIdentity, TOP_LEVEL_DEPTH};
use crate::store::{Store, UserInput};
use crate::unit::{UnitLoader, YamlLoader};
use crate::watcher::{ChangeSource, NotifyChangeSource, WatchOptions, WatcherSubsystem};
use crate::BoxFuture;
use serde_yaml::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn, Instrument};

/// Future returned by every task invocation: `None` when the task was not found
pub type RunFuture = BoxFuture<Result<Option<Value>>>;

/// What a task listing shows for one task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSummary {
    pub usage: Option<String>,
    pub description: Option<String>,
}

/// Builder for [`Runner`]
pub struct RunnerBuilder {
    settings: Settings,
    input: ProcessInput,
    expander: Arc<dyn PathExpander>,
    loader: Arc<dyn UnitLoader>,
    change_source: Arc<dyn ChangeSource>,
    watch: bool,
}

impl RunnerBuilder {
    pub fn new(settings: Settings) -> Self {
        RunnerBuilder {
            settings,
            input: ProcessInput::default(),
            expander: Arc::new(GlobExpander),
            loader: Arc::new(YamlLoader),
            change_source: Arc::new(NotifyChangeSource),
            watch: false,
        }
    }

    /// Raw process input (requested task and `KEY=VALUE` words)
    pub fn input(mut self, input: ProcessInput) -> Self {
        self.input = input;
        self
    }

    /// Replace the path expansion collaborator
    pub fn expander(mut self, expander: Arc<dyn PathExpander>) -> Self {
        self.expander = expander;
        self
    }

    /// Replace the unit loader
    pub fn loader(mut self, loader: Arc<dyn UnitLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the filesystem change collaborator
    pub fn change_source(mut self, change_source: Arc<dyn ChangeSource>) -> Self {
        self.change_source = change_source;
        self
    }

    /// Start the watcher after the requested task in [`Runner::run`]
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn build(self) -> Arc<Runner> {
        let storage = Store::new();
        storage.set_all(self.settings.store_values());

        let watch_options = WatchOptions::merged(&self.settings.watch);

        Arc::new(Runner {
            identity: ScopedIdentity::new(self.settings.name.clone()),
            settings: self.settings,
            storage,
            user_input: UserInput::new(self.input),
            registry: OnceCell::new(),
            expander: self.expander,
            loader: self.loader,
            watcher: WatcherSubsystem::new(self.change_source, watch_options),
            watch_requested: self.watch,
        })
    }
}

/// The task orchestration engine
pub struct Runner {
    settings: Settings,
    identity: ScopedIdentity,
    storage: Store,
    user_input: UserInput,
    registry: OnceCell<TaskRegistry>,
    expander: Arc<dyn PathExpander>,
    loader: Arc<dyn UnitLoader>,
    watcher: WatcherSubsystem,
    watch_requested: bool,
}

impl Runner {
    pub fn builder(settings: Settings) -> RunnerBuilder {
        RunnerBuilder::new(settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runner-level identity every invocation identity derives from
    pub fn identity(&self) -> &ScopedIdentity {
        &self.identity
    }

    pub fn set_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.storage.set(key, value);
    }

    pub fn set_values<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.storage.set_all(values);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.storage.get(key)
    }

    pub fn set_user_input_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.user_input.set(key, value);
    }

    pub fn user_input_value(&self, key: &str) -> Option<Value> {
        self.user_input.get(key)
    }

    pub fn process_input(&self) -> &ProcessInput {
        self.user_input.raw()
    }

    pub fn loader(&self) -> &dyn UnitLoader {
        self.loader.as_ref()
    }

    pub fn expander(&self) -> &dyn PathExpander {
        self.expander.as_ref()
    }

    /// The task registry, discovered on first use
    ///
    /// Concurrent first callers share one discovery. A failed discovery
    /// leaves the registry unset and is reported to every waiting caller's
    /// own attempt.
    pub async fn registry(&self) -> Result<&TaskRegistry> {
        self.registry
            .get_or_try_init(|| TaskRegistry::discover(&self.settings.tasks_path, self.expander()))
            .await
    }

    /// Invoke a task at the given depth
    ///
    /// A name missing from the registry is logged and yields `Ok(None)`.
    /// Load and body failures are wrapped with the task name.
    pub fn execute(
        self: &Arc<Self>,
        task_name: impl Into<String>,
        depth: usize,
        options: Option<Value>,
    ) -> RunFuture {
        let runner = Arc::clone(self);
        let task_name = task_name.into();

        Box::pin(async move {
            let location = match runner.registry().await?.get(&task_name) {
                Some(location) => location.to_path_buf(),
                None => {
                    warn!(task = %task_name, depth, "task \"{}\" not found", task_name);
                    return Ok(None);
                }
            };

            let ctx = ExecutionContext::new(Arc::clone(&runner), task_name.clone(), depth, options);
            let span = ctx.span().clone();

            async move {
                let started = Instant::now();
                info!("task started");

                let outcome = async {
                    let unit = runner.loader().load_task(&location).await?;
                    unit.invoke(ctx).await
                }
                .await;

                match outcome {
                    Ok(value) => {
                        info!(duration = ?started.elapsed(), "task finished");
                        Ok(Some(value))
                    }
                    Err(source) => Err(RunnerError::Execution {
                        task: task_name,
                        source: Box::new(source),
                    }),
                }
            }
            .instrument(span)
            .await
        })
    }

    /// Run a task as a top-level invocation
    pub async fn run_task(
        self: &Arc<Self>,
        name: &str,
        options: Option<Value>,
    ) -> Result<Option<Value>> {
        self.execute(name, TOP_LEVEL_DEPTH, options).await
    }

    /// Run the task named by the first positional process input
    pub async fn run_requested_task(self: &Arc<Self>) -> Result<Option<Value>> {
        match self.process_input().requested_task() {
            Some(name) => {
                let name = name.to_string();
                self.run_task(&name, None).await
            }
            None => {
                self.registry().await?;
                debug!("no task requested");
                Ok(None)
            }
        }
    }

    /// Names of all discovered tasks, in lexical order
    pub async fn task_list(&self) -> Result<Vec<String>> {
        Ok(self.registry().await?.names())
    }

    /// Usage and description of a task, loading its unit
    pub async fn task_summary(&self, name: &str) -> Result<Option<TaskSummary>> {
        let location = match self.registry().await?.get(name) {
            Some(location) => location.to_path_buf(),
            None => return Ok(None),
        };
        let unit = self.loader.load_task(&location).await?;
        Ok(Some(TaskSummary {
            usage: unit.usage(),
            description: unit.description(),
        }))
    }

    /// Start the watcher subsystem; a no-op when it already runs
    pub async fn run_watcher(self: &Arc<Self>) -> Result<()> {
        self.registry().await?;
        self.watcher.start(self).await
    }

    pub fn is_watcher_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// Number of watches currently registered
    pub fn watch_count(&self) -> usize {
        self.watcher.watch_count()
    }

    /// Drop every active watch and allow the watcher to start again
    pub fn stop_watcher(&self) {
        self.watcher.stop();
    }

    /// Run the requested task, then start watching if asked to
    ///
    /// With persistent watching this only returns after Ctrl-C.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let started = Instant::now();
        self.run_requested_task().await?;

        if self.watch_requested {
            self.run_watcher().await?;
            if self.watcher.watch_count() == 0 {
                info!("no watchers found, nothing to watch");
                self.stop_watcher();
            } else if self.watcher.options().persistent {
                info!("watching for changes, press Ctrl-C to stop");
                tokio::signal::ctrl_c().await?;
                self.stop_watcher();
            }
        }

        debug!(duration = ?started.elapsed(), "runner finished");
        Ok(())
    }
}
