//! Main CLI application

use crate::config::{locate_config_file, parse_config_file, Config, Settings};
use crate::error::{ConfigError, Result};
use crate::input::ProcessInput;
use crate::logging::{self, Verbosity};
use crate::runner::{Runner, TaskSummary};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        App {
            command: build_command(),
        }
    }

    /// Run the application with the process arguments
    pub fn run(self) -> Result<()> {
        self.run_from(env::args_os())
    }

    /// Run the application with explicit arguments (the first is the binary name)
    pub fn run_from<I, T>(mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);

        if let Some(shell) = matches.get_one::<Shell>("completions").copied() {
            let name = self.command.get_name().to_string();
            clap_complete::generate(shell, &mut self.command, name, &mut io::stdout());
            return Ok(());
        }

        let verbosity = get_verbosity(&matches);
        logging::init(verbosity);

        let input = ProcessInput::from_words(
            matches
                .get_many::<String>("input")
                .into_iter()
                .flatten()
                .cloned(),
        );
        let list = matches.get_flag("list");
        let watch = matches.get_flag("watch");

        if input.requested_task().is_none() && !list && !watch {
            self.command.print_help()?;
            println!();
            return Ok(());
        }

        let settings = load_settings(
            matches.get_one::<PathBuf>("file").map(PathBuf::as_path),
            matches.get_one::<PathBuf>("tasks-path").map(PathBuf::as_path),
        )?;
        load_env_file(&settings.working_dir)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            let runner = Runner::builder(settings).input(input).watch(watch).build();
            if list {
                print_task_list(&runner, verbosity == Verbosity::Verbose).await
            } else {
                runner.run().await
            }
        })
    }
}

/// Build the clap command
fn build_command() -> Command {
    Command::new("dirrun")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs tasks discovered from a directory tree, optionally reacting to file changes")
        .arg(
            Arg::new("input")
                .value_name("TASK [KEY=VALUE]...")
                .help("Task to run, followed by KEY=VALUE input values")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to dirrun.yml config file"),
        )
        .arg(
            Arg::new("tasks-path")
                .long("tasks-path")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Tasks directory, overrides the config file"),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Start the watchers after the task ran")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script"),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Resolve settings from the config file and the command-line overrides
///
/// Without any config file, `--tasks-path` alone is enough to run.
pub fn load_settings(file: Option<&Path>, tasks_path: Option<&Path>) -> Result<Settings> {
    let tasks_path = match tasks_path {
        Some(path) => Some(env::current_dir()?.join(path)),
        None => None,
    };

    let settings = match locate_config_file(file) {
        Ok(config_path) => {
            debug!(config = %config_path.display(), "using config file");
            let mut config = parse_config_file(&config_path)?;
            if tasks_path.is_some() {
                config.tasks_path = tasks_path;
            }
            Settings::from_config(config, Some(&config_path))?
        }
        Err(ConfigError::NotFound(_)) if file.is_none() && tasks_path.is_some() => {
            let config = Config {
                tasks_path,
                ..Config::default()
            };
            Settings::from_config(config, None)?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(settings)
}

/// Load `.env` next to the config file; variables already set win
fn load_env_file(dir: &Path) -> Result<()> {
    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(());
    }
    dotenvy::from_path(&path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to load {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "loaded environment file");
    Ok(())
}

/// Print discovered tasks with their usage lines
///
/// Verbose listings add each task's description on the lines below it.
async fn print_task_list(runner: &Arc<Runner>, verbose: bool) -> Result<()> {
    let names = runner.task_list().await?;
    if names.is_empty() {
        println!("{}", "No tasks found".yellow());
        return Ok(());
    }

    let width = names.iter().map(String::len).max().unwrap_or(0);
    println!("{}", "Tasks:".bold());
    for name in &names {
        let summary = match runner.task_summary(name).await {
            Ok(summary) => summary.unwrap_or_default(),
            Err(e) => {
                warn!(task = %name, "failed to read usage: {}", e);
                TaskSummary::default()
            }
        };
        let usage = summary.usage.unwrap_or_default();
        println!("  {:<width$}  {}", name.green(), usage.dimmed(), width = width);

        if verbose {
            for line in summary.description.iter().flat_map(|d| d.lines()) {
                println!("      {}", line);
            }
        }
    }
    Ok(())
}

/// Run the CLI application
pub fn run() -> Result<()> {
    App::new().run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_get_verbosity_normal() {
        let matches = build_command().get_matches_from(vec!["dirrun"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Normal);
    }

    #[test]
    fn test_get_verbosity_silent_wins() {
        let matches = build_command().get_matches_from(vec!["dirrun", "-s", "-v"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Silent);
    }

    #[test]
    fn test_input_words_after_task() {
        let matches =
            build_command().get_matches_from(vec!["dirrun", "-w", "build", "mode=release", "x"]);
        let words: Vec<&String> = matches.get_many::<String>("input").unwrap().collect();
        assert_eq!(words, vec!["build", "mode=release", "x"]);
        assert!(matches.get_flag("watch"));
    }

    #[test]
    fn test_flags_after_task_are_parsed() {
        let matches = build_command().get_matches_from(vec!["dirrun", "build", "-w", "mode=x"]);
        let words: Vec<&String> = matches.get_many::<String>("input").unwrap().collect();
        assert_eq!(words, vec!["build", "mode=x"]);
        assert!(matches.get_flag("watch"));
    }

    #[test]
    fn test_verbosity_after_task() {
        let matches = build_command().get_matches_from(vec!["dirrun", "build", "-q"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Quiet);
    }

    #[test]
    fn test_load_settings_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dirrun.yml");
        fs::write(&config_path, "tasks-path: units\nname: shop\n").unwrap();

        let settings = load_settings(Some(&config_path), None).unwrap();
        assert_eq!(settings.name, "shop");
        assert_eq!(settings.tasks_path, temp_dir.path().join("units"));
    }

    #[test]
    fn test_load_settings_tasks_path_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dirrun.yml");
        fs::write(&config_path, "tasks-path: units\n").unwrap();
        let other = temp_dir.path().join("other");

        let settings = load_settings(Some(&config_path), Some(&other)).unwrap();
        assert_eq!(settings.tasks_path, other);
    }

    #[test]
    fn test_load_settings_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.yml");
        assert!(load_settings(Some(&missing), Some(temp_dir.path())).is_err());
    }
}
