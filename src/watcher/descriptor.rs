//! Watcher descriptors
//!
//! A watcher unit returns a raw document like:
//!
//! ```yaml
//! paths:
//!   - src
//!   - "${assets-dir}"
//! events:
//!   change: cargo build
//!   unlink:
//!     - task: clean
//! ```
//!
//! [`WatcherDescriptor::from_value`] checks the shape and parses every
//! callback up front, so registration never starts from a half-valid set.

use crate::error::{Result, RunnerError};
use crate::unit::{run_entries_from_value, Task};
use crate::watcher::source::{ALL_EVENTS, EVENT_NAMES};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validated watcher descriptor
#[derive(Debug, Clone)]
pub struct WatcherDescriptor {
    paths: Vec<String>,
    events: BTreeMap<String, Arc<Task>>,
}

impl WatcherDescriptor {
    /// Validate a raw descriptor returned by the watcher named `watcher`
    pub fn from_value(watcher: &str, raw: &Value) -> Result<Self> {
        let invalid = |reason: String| RunnerError::WatcherValidation {
            watcher: watcher.to_string(),
            reason,
        };

        let map = raw
            .as_mapping()
            .ok_or_else(|| invalid("descriptor must be a mapping".to_string()))?;

        let paths = match map.get("paths").cloned() {
            Some(Value::Sequence(items)) if !items.is_empty() => items
                .into_iter()
                .map(|item| match item {
                    Value::String(path) if !path.trim().is_empty() => Ok(path),
                    other => Err(invalid(format!(
                        "'paths' entries must be non-empty strings, got {:?}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(Value::Sequence(_)) => {
                return Err(invalid("'paths' must not be empty".to_string()))
            }
            Some(_) => return Err(invalid("'paths' must be a sequence".to_string())),
            None => return Err(invalid("missing 'paths'".to_string())),
        };

        let bindings = match map.get("events") {
            Some(Value::Mapping(bindings)) if !bindings.is_empty() => bindings,
            Some(Value::Mapping(_)) => {
                return Err(invalid("'events' must not be empty".to_string()))
            }
            Some(_) => return Err(invalid("'events' must be a mapping".to_string())),
            None => return Err(invalid("missing 'events'".to_string())),
        };

        let mut events = BTreeMap::new();
        for (key, callback) in bindings {
            let name = key
                .as_str()
                .ok_or_else(|| invalid(format!("event name must be a string, got {:?}", key)))?;

            if name != ALL_EVENTS && !EVENT_NAMES.contains(&name) {
                return Err(invalid(format!(
                    "unknown event '{}' (expected one of {}, {})",
                    name,
                    EVENT_NAMES.join(", "),
                    ALL_EVENTS
                )));
            }

            let entries = run_entries_from_value(callback.clone())
                .map_err(|e| invalid(format!("callback for '{}' is invalid: {}", name, e)))?;
            if entries.is_empty() {
                return Err(invalid(format!("callback for '{}' is empty", name)));
            }

            events.insert(name.to_string(), Arc::new(Task::from_entries(entries)));
        }

        Ok(WatcherDescriptor { paths, events })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Bound event names, in lexical order
    pub fn event_names(&self) -> Vec<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    /// Callbacks to run for one event: its own binding, then `all`
    pub fn callbacks_for(&self, event: &str) -> Vec<Arc<Task>> {
        let mut callbacks: Vec<Arc<Task>> = self.events.get(event).cloned().into_iter().collect();
        if event != ALL_EVENTS {
            callbacks.extend(self.events.get(ALL_EVENTS).cloned());
        }
        callbacks
    }

    /// Watched paths, relative ones resolved against `base`
    pub fn resolved_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.paths.iter().map(|p| base.join(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<WatcherDescriptor> {
        let raw: Value = serde_yaml::from_str(yaml).unwrap();
        WatcherDescriptor::from_value("app", &raw)
    }

    fn reason(result: Result<WatcherDescriptor>) -> String {
        match result {
            Err(RunnerError::WatcherValidation { watcher, reason }) => {
                assert_eq!(watcher, "app");
                reason
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_descriptor() {
        let descriptor = parse(
            r#"
paths: [src, /abs/assets]
events:
  change: echo changed
  unlink:
    - task: clean
"#,
        )
        .unwrap();

        assert_eq!(descriptor.paths(), &["src", "/abs/assets"]);
        assert_eq!(descriptor.event_names(), vec!["change", "unlink"]);
        assert_eq!(
            descriptor.resolved_paths(Path::new("/work")),
            vec![PathBuf::from("/work/src"), PathBuf::from("/abs/assets")]
        );
    }

    #[test]
    fn test_empty_paths_rejected() {
        let msg = reason(parse("paths: []\nevents: {change: echo hi}\n"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_non_mapping_events_rejected() {
        let msg = reason(parse("paths: [src]\nevents: [change]\n"));
        assert!(msg.contains("must be a mapping"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(reason(parse("events: {change: echo}\n")).contains("missing 'paths'"));
        assert!(reason(parse("paths: [src]\n")).contains("missing 'events'"));
        assert!(reason(parse("- src\n")).contains("mapping"));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let msg = reason(parse("paths: [src]\nevents: {rename: echo}\n"));
        assert!(msg.contains("unknown event 'rename'"));
    }

    #[test]
    fn test_empty_callback_rejected() {
        let msg = reason(parse("paths: [src]\nevents: {change: ~}\n"));
        assert!(msg.contains("is empty"));
    }

    #[test]
    fn test_all_receives_every_event() {
        let descriptor = parse("paths: [src]\nevents: {change: echo a, all: echo b}\n").unwrap();

        assert_eq!(descriptor.callbacks_for("change").len(), 2);
        assert_eq!(descriptor.callbacks_for("add").len(), 1);
        assert_eq!(descriptor.callbacks_for("all").len(), 1);
    }
}
