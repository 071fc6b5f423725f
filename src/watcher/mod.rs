//! Watcher dispatch
//!
//! Watcher units sit next to task units as `watcher.yml` files. Starting the
//! subsystem invokes each of them once, validates what they return and then
//! registers one watch per descriptor. Every event occurrence runs its
//! callbacks in a tokio task of its own; a failing callback is logged and
//! affects nothing else.

pub mod descriptor;
pub mod options;
pub mod source;

pub use descriptor::WatcherDescriptor;
pub use options::{IgnoreFilter, WatchOptions, DEFAULT_IGNORED, DEFAULT_POLL_INTERVAL_MS};
pub use source::{
    ChangeSource, ChannelChangeSource, FsEvent, NotifyChangeSource, Subscription, WatchHandle,
    ALL_EVENTS, EVENT_NAMES,
};

use crate::error::{display_chain, Result, RunnerError};
use crate::registry::{scan, watcher_name_for, watcher_patterns};
use crate::runner::{ExecutionContext, Runner, TOP_LEVEL_DEPTH};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

struct ActiveWatch {
    watcher: String,
    _handle: WatchHandle,
    dispatcher: JoinHandle<()>,
}

/// Discovers watcher units and routes change events to their callbacks
pub struct WatcherSubsystem {
    source: Arc<dyn ChangeSource>,
    options: WatchOptions,
    running: AtomicBool,
    active: Mutex<Vec<ActiveWatch>>,
}

impl WatcherSubsystem {
    pub fn new(source: Arc<dyn ChangeSource>, options: WatchOptions) -> Self {
        WatcherSubsystem {
            source,
            options,
            running: AtomicBool::new(false),
            active: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of watches currently registered
    pub fn watch_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    /// Start watching; a second call while running only logs a notice
    pub async fn start(&self, runner: &Arc<Runner>) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("watcher already running");
            return Ok(());
        }

        let result = self.start_watches(runner).await;
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn start_watches(&self, runner: &Arc<Runner>) -> Result<()> {
        let root = runner.settings().watchers_path.clone();
        debug!(root = %root.display(), "collecting watchers");

        let mut descriptors = Vec::new();
        for relative in scan(runner.expander(), &watcher_patterns(), &root).await? {
            let Some(name) = watcher_name_for(&relative) else {
                continue;
            };
            let raw = invoke_watcher(runner, &name, &root.join(&relative)).await?;
            descriptors.push((name, raw));
        }

        // Every descriptor must be valid before anything is registered.
        let descriptors = descriptors
            .into_iter()
            .map(|(name, raw)| WatcherDescriptor::from_value(&name, &raw).map(|d| (name, d)))
            .collect::<Result<Vec<_>>>()?;

        let base = runner.settings().working_dir.clone();
        let mut started = Vec::with_capacity(descriptors.len());
        for (name, descriptor) in descriptors {
            let paths = descriptor.resolved_paths(&base);
            let subscription = match self.source.watch(&paths, &self.options) {
                Ok(subscription) => subscription,
                Err(e) => {
                    for watch in started {
                        stop_watch(watch);
                    }
                    return Err(e);
                }
            };

            info!(watcher = %name, paths = ?descriptor.paths(), "watching");
            let dispatcher = tokio::spawn(dispatch(
                Arc::clone(runner),
                name.clone(),
                Arc::new(descriptor),
                subscription.events,
            ));
            started.push(ActiveWatch {
                watcher: name,
                _handle: subscription.handle,
                dispatcher,
            });
        }

        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(started);
        Ok(())
    }

    /// Drop all watches and release the running flag
    pub fn stop(&self) {
        let watches: Vec<ActiveWatch> = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for watch in watches {
            stop_watch(watch);
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

fn stop_watch(watch: ActiveWatch) {
    debug!(watcher = %watch.watcher, "stopping watch");
    watch.dispatcher.abort();
}

async fn invoke_watcher(
    runner: &Arc<Runner>,
    name: &str,
    location: &std::path::Path,
) -> Result<serde_yaml::Value> {
    let ctx = ExecutionContext::new(Arc::clone(runner), name, TOP_LEVEL_DEPTH, None);
    let span = ctx.span().clone();

    async {
        let unit = runner.loader().load_watcher(location).await?;
        unit.invoke(ctx).await
    }
    .instrument(span)
    .await
    .map_err(|source| RunnerError::Watcher {
        watcher: name.to_string(),
        source: Box::new(source),
    })
}

async fn dispatch(
    runner: Arc<Runner>,
    watcher: String,
    descriptor: Arc<WatcherDescriptor>,
    mut events: mpsc::UnboundedReceiver<FsEvent>,
) {
    while let Some(event) = events.recv().await {
        debug!(watcher = %watcher, event = %event.name, path = %event.path.display(), "change");

        for callback in descriptor.callbacks_for(&event.name) {
            let ctx = ExecutionContext::new(
                Arc::clone(&runner),
                watcher.clone(),
                TOP_LEVEL_DEPTH,
                Some(event.to_options()),
            );
            let span = ctx.span().clone();
            let watcher = watcher.clone();
            let event = event.clone();

            tokio::spawn(
                async move {
                    if let Err(err) = callback.execute(&ctx).await {
                        error!(
                            watcher = %watcher,
                            event = %event.name,
                            path = %event.path.display(),
                            "watcher callback failed: {}",
                            display_chain(&err)
                        );
                    }
                }
                .instrument(span),
            );
        }
    }
}
