//! When condition evaluation
//!
//! This module handles evaluating conditional expressions for run items.

use crate::error::UnitResult;
use crate::unit::command::check_command;
use crate::unit::scope::Scope;
use crate::unit::task::{When, WhenCondition};
use std::env;

/// Evaluate a list of when conditions (all must be true - AND logic)
pub async fn evaluate_when_list(when_list: &[When], scope: &Scope<'_>) -> UnitResult<bool> {
    for when in when_list {
        if !evaluate_when(when, scope).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a single when condition
pub async fn evaluate_when(when: &When, scope: &Scope<'_>) -> UnitResult<bool> {
    let ctx = scope.ctx();

    match &when.condition {
        WhenCondition::Always => Ok(true),

        WhenCondition::Equal { left, right } => {
            Ok(scope.interpolate(left)? == scope.interpolate(right)?)
        }

        WhenCondition::NotEqual { left, right } => {
            Ok(scope.interpolate(left)? != scope.interpolate(right)?)
        }

        WhenCondition::Command(cmd) => check_command(cmd, scope).await,

        WhenCondition::Exists(path) => {
            let path = scope.interpolate(path)?;
            Ok(ctx.working_dir().join(path).exists())
        }

        WhenCondition::EnvSet(var_name) => Ok(env::var(scope.interpolate(var_name)?).is_ok()),

        WhenCondition::EnvNotSet(var_name) => {
            Ok(env::var(scope.interpolate(var_name)?).is_err())
        }

        WhenCondition::OptionSet(name) => Ok(ctx.option(name).is_some()),

        WhenCondition::OptionNotSet(name) => Ok(ctx.option(name).is_none()),

        WhenCondition::ValueSet(key) => Ok(ctx.storage_value(key).is_some()),
    }
}
