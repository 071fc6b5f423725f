//! Command execution
//!
//! This module handles executing shell commands through the configured
//! interpreter.

use crate::error::{UnitError, UnitResult};
use crate::unit::scope::Scope;
use crate::unit::task::Command;
use std::process::Stdio;
use tokio::process::Command as ProcessCommand;
use tracing::info;

/// Execute a command in the given scope
pub async fn execute_command(cmd: &Command, scope: &Scope<'_>) -> UnitResult<()> {
    let exec_str = scope.interpolate(cmd.exec())?;

    if !cmd.is_quiet() {
        let print_str = scope
            .interpolate(cmd.print())
            .unwrap_or_else(|_| cmd.print().to_string());
        info!(command = %print_str, "run");
    }

    let working_dir = match cmd.dir() {
        Some(dir) => scope.ctx().working_dir().join(scope.interpolate(dir)?),
        None => scope.ctx().working_dir().to_path_buf(),
    };

    let (program, mut command) = shell_command(scope, &exec_str)?;
    command
        .current_dir(&working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let status = command
        .status()
        .await
        .map_err(|source| UnitError::Spawn { program, source })?;

    if !status.success() {
        return Err(UnitError::CommandFailed(status.code()));
    }

    Ok(())
}

/// Check if a command succeeds (for when conditions)
pub async fn check_command(cmd_str: &str, scope: &Scope<'_>) -> UnitResult<bool> {
    let exec_str = scope.interpolate(cmd_str)?;

    let (program, mut command) = shell_command(scope, &exec_str)?;
    command
        .current_dir(scope.ctx().working_dir())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = command
        .status()
        .await
        .map_err(|source| UnitError::Spawn { program, source })?;

    Ok(status.success())
}

/// Build `<interpreter...> <exec>` with the scope's environment applied
fn shell_command(scope: &Scope<'_>, exec: &str) -> UnitResult<(String, ProcessCommand)> {
    let (program, args) = scope
        .ctx()
        .interpreter()
        .split_first()
        .ok_or(UnitError::EmptyInterpreter)?;

    let mut command = ProcessCommand::new(program);
    command.args(args).arg(exec);
    scope.apply_env(&mut command);

    Ok((program.clone(), command))
}
