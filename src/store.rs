//! Process-scoped key-value stores
//!
//! Two instances live on every runner: the configuration store, seeded from
//! the config file, and the user-input store, which falls back to raw
//! command-line input before reporting a key as absent.

use crate::input::ProcessInput;
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A string-keyed map of arbitrary values
///
/// There is no removal; a later write overwrites an earlier one. The lock only
/// makes single operations safe to share between watcher chains, it gives no
/// ordering between chains.
#[derive(Debug, Default)]
pub struct Store {
    values: RwLock<HashMap<String, Value>>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Set every entry of `values`, one `set` at a time
    pub fn set_all<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Get a value, `None` when the key was never set
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Whether the key has been set
    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

/// User-supplied runtime input: explicit overrides first, raw input second
#[derive(Debug, Default)]
pub struct UserInput {
    overrides: Store,
    raw: ProcessInput,
}

impl UserInput {
    pub fn new(raw: ProcessInput) -> Self {
        UserInput {
            overrides: Store::new(),
            raw,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.overrides.set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.overrides
            .get(key)
            .or_else(|| self.raw.value(key).map(|v| Value::String(v.to_string())))
    }

    /// The raw process input behind this store
    pub fn raw(&self) -> &ProcessInput {
        &self.raw
    }
}
