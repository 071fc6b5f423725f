//! Filesystem change sources
//!
//! A [`ChangeSource`] turns a set of paths into a stream of named events.
//! [`NotifyChangeSource`] is backed by the `notify` crate; the
//! [`ChannelChangeSource`] delivers events pushed by the caller and suits
//! embedding programs that already have their own change feed.

use crate::error::{ConfigError, Result, RunnerError};
use crate::watcher::options::{IgnoreFilter, WatchOptions};
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use serde_yaml::{Mapping, Value};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::warn;

/// Event names a descriptor may bind, besides [`ALL_EVENTS`]
pub const EVENT_NAMES: &[&str] = &["add", "addDir", "change", "unlink", "unlinkDir"];

/// Pseudo-event receiving every event
pub const ALL_EVENTS: &str = "all";

/// One filesystem change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub name: String,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        FsEvent {
            name: name.into(),
            path: path.into(),
        }
    }

    /// The event as callback options: `{event, path}`
    pub fn to_options(&self) -> Value {
        let mut options = Mapping::new();
        options.insert(Value::from("event"), Value::from(self.name.clone()));
        options.insert(
            Value::from("path"),
            Value::from(self.path.display().to_string()),
        );
        Value::Mapping(options)
    }
}

/// Keeps a watch alive; dropping it ends the watch
pub type WatchHandle = Box<dyn Any + Send>;

/// A live watch: its handle and the events it produces
pub struct Subscription {
    pub handle: WatchHandle,
    pub events: mpsc::UnboundedReceiver<FsEvent>,
}

/// Filesystem change-notification collaborator
pub trait ChangeSource: Send + Sync {
    fn watch(&self, paths: &[PathBuf], options: &WatchOptions) -> Result<Subscription>;
}

fn ignore_filter(paths: &[PathBuf], options: &WatchOptions) -> Result<IgnoreFilter> {
    options.ignore_filter(paths).map_err(|e| {
        RunnerError::Config(ConfigError::Invalid(format!(
            "Invalid watch.ignored pattern: {}",
            e
        )))
    })
}

/// [`ChangeSource`] backed by `notify`
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyChangeSource;

impl ChangeSource for NotifyChangeSource {
    fn watch(&self, paths: &[PathBuf], options: &WatchOptions) -> Result<Subscription> {
        let filter = ignore_filter(paths, options)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let handler = move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                for path in &event.paths {
                    if filter.is_ignored(path) {
                        continue;
                    }
                    if let Some(name) = classify(&event.kind, path) {
                        // The receiver is gone once the watch is stopped.
                        let _ = tx.send(FsEvent::new(name, path.clone()));
                    }
                }
            }
            Err(err) => warn!(error = %err, "filesystem watch error"),
        };

        let handle: WatchHandle = if options.use_polling {
            let config = notify::Config::default().with_poll_interval(options.interval);
            Box::new(register(PollWatcher::new(handler, config), paths)?)
        } else {
            Box::new(register(
                RecommendedWatcher::new(handler, notify::Config::default()),
                paths,
            )?)
        };

        Ok(Subscription { handle, events: rx })
    }
}

fn register<W: Watcher>(watcher: notify::Result<W>, paths: &[PathBuf]) -> Result<W> {
    let mut watcher = watcher.map_err(|source| RunnerError::Watch {
        path: paths.first().cloned().unwrap_or_default(),
        source,
    })?;
    for path in paths {
        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|source| RunnerError::Watch {
                path: path.clone(),
                source,
            })?;
    }
    Ok(watcher)
}

/// Map a `notify` event kind to an event name
fn classify(kind: &EventKind, path: &Path) -> Option<&'static str> {
    match kind {
        EventKind::Create(CreateKind::Folder) => Some("addDir"),
        EventKind::Create(_) => Some(if path.is_dir() { "addDir" } else { "add" }),
        EventKind::Modify(ModifyKind::Name(_)) => Some(if !path.exists() {
            "unlink"
        } else if path.is_dir() {
            "addDir"
        } else {
            "add"
        }),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some("change"),
        EventKind::Remove(RemoveKind::Folder) => Some("unlinkDir"),
        EventKind::Remove(_) => Some("unlink"),
        _ => None,
    }
}

struct ChannelSubscriber {
    paths: Vec<PathBuf>,
    filter: IgnoreFilter,
    tx: mpsc::UnboundedSender<FsEvent>,
}

/// [`ChangeSource`] fed by [`ChannelChangeSource::emit`]
#[derive(Default)]
pub struct ChannelChangeSource {
    subscribers: Mutex<Vec<ChannelSubscriber>>,
}

impl ChannelChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of watches registered so far
    pub fn registrations(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Paths of every registered watch, in registration order
    pub fn watched_paths(&self) -> Vec<Vec<PathBuf>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.paths.clone())
            .collect()
    }

    /// Deliver an event to every live watch covering `path`
    ///
    /// Returns how many watches received it.
    pub fn emit(&self, name: &str, path: impl Into<PathBuf>) -> usize {
        let path = path.into();
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        subscribers
            .iter()
            .filter(|s| s.paths.iter().any(|root| path.starts_with(root)))
            .filter(|s| !s.filter.is_ignored(&path))
            .filter(|s| s.tx.send(FsEvent::new(name, path.clone())).is_ok())
            .count()
    }
}

impl ChangeSource for ChannelChangeSource {
    fn watch(&self, paths: &[PathBuf], options: &WatchOptions) -> Result<Subscription> {
        let filter = ignore_filter(paths, options)?;
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ChannelSubscriber {
                paths: paths.to_vec(),
                filter,
                tx,
            });

        Ok(Subscription {
            handle: Box::new(()),
            events: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange};

    #[test]
    fn test_classify() {
        let missing = Path::new("/definitely/not/here.txt");
        assert_eq!(classify(&EventKind::Create(CreateKind::File), missing), Some("add"));
        assert_eq!(
            classify(&EventKind::Create(CreateKind::Folder), missing),
            Some("addDir")
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content)), missing),
            Some("change")
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File), missing),
            Some("unlink")
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::Folder), missing),
            Some("unlinkDir")
        );
        assert_eq!(classify(&EventKind::Access(AccessKind::Any), missing), None);
    }

    #[test]
    fn test_event_options() {
        let event = FsEvent::new("change", "/src/main.rs");
        let options = event.to_options();
        assert_eq!(options.get("event"), Some(&Value::from("change")));
        assert_eq!(options.get("path"), Some(&Value::from("/src/main.rs")));
    }

    #[tokio::test]
    async fn test_channel_source_routes_by_path() {
        let source = ChannelChangeSource::new();
        let options = WatchOptions::default();
        let mut src = source.watch(&[PathBuf::from("/p/src")], &options).unwrap();
        let mut docs = source.watch(&[PathBuf::from("/p/docs")], &options).unwrap();

        assert_eq!(source.registrations(), 2);
        assert_eq!(source.emit("change", "/p/src/lib.rs"), 1);
        assert_eq!(source.emit("add", "/p/src/.hidden"), 0);

        assert_eq!(
            src.events.recv().await,
            Some(FsEvent::new("change", "/p/src/lib.rs"))
        );
        assert!(docs.events.try_recv().is_err());
    }
}
