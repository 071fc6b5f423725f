//! Invocation-local state of a running unit
//!
//! A [`Scope`] wraps the execution context of one invocation together with
//! the environment that `set-environment` items build up. It never outlives
//! the invocation and is never handed to nested tasks.

use crate::error::InterpolationResult;
use crate::runner::ExecutionContext;
use crate::unit::interpolate::interpolate;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::env;
use tokio::process::Command;

pub struct Scope<'a> {
    ctx: &'a ExecutionContext,
    env: BTreeMap<String, Option<String>>,
}

impl<'a> Scope<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Scope {
            ctx,
            env: BTreeMap::new(),
        }
    }

    pub fn ctx(&self) -> &'a ExecutionContext {
        self.ctx
    }

    /// Set (`Some`) or unset (`None`) an environment variable for later commands
    pub fn set_env(&mut self, key: impl Into<String>, value: Option<String>) {
        self.env.insert(key.into(), value);
    }

    /// Resolve a variable name
    ///
    /// Order: `task` and `depth`, invocation environment, options, user
    /// input, configuration store, process environment. A variable unset via
    /// `set-environment` hides the process environment only.
    pub fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "task" => return Some(self.ctx.task_name().to_string()),
            "depth" => return Some(self.ctx.depth().to_string()),
            _ => {}
        }

        let local = self.env.get(name);
        if let Some(Some(value)) = local {
            return Some(value.clone());
        }

        self.ctx
            .option(name)
            .map(value_to_string)
            .or_else(|| self.ctx.user_input_value(name).map(|v| value_to_string(&v)))
            .or_else(|| self.ctx.storage_value(name).map(|v| value_to_string(&v)))
            .or_else(|| match local {
                Some(None) => None,
                _ => env::var(name).ok(),
            })
    }

    /// Interpolate a template against this scope
    pub fn interpolate(&self, template: &str) -> InterpolationResult<String> {
        interpolate(template, |name| self.lookup(name))
    }

    /// Interpolate every string inside a YAML value
    pub fn interpolate_value(&self, value: &Value) -> InterpolationResult<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.interpolate(s)?),
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .map(|item| self.interpolate_value(item))
                    .collect::<InterpolationResult<_>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = serde_yaml::Mapping::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.interpolate_value(v)?);
                }
                Value::Mapping(out)
            }
            other => other.clone(),
        })
    }

    /// Apply the invocation environment to a child process
    pub fn apply_env(&self, command: &mut Command) {
        for (key, value) in &self.env {
            match value {
                Some(value) => {
                    command.env(key, value);
                }
                None => {
                    command.env_remove(key);
                }
            }
        }
    }
}

/// Render a stored value the way it appears inside a command line
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&Value::Null), "");
        assert_eq!(value_to_string(&Value::from(true)), "true");
        assert_eq!(value_to_string(&Value::from(42)), "42");
        assert_eq!(value_to_string(&Value::from("text")), "text");

        let list: Value = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(value_to_string(&list), "- a\n- b");
    }
}
