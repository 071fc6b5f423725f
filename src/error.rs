//! Error types for dirrun

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dirrun operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Main error type for dirrun
///
/// Wrapping variants keep the wrapped error reachable through
/// [`std::error::Error::source`], so a report walks the whole chain from the
/// outermost call site down to the root cause.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Startup configuration is missing or invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scanning a task or watcher directory failed
    #[error("collecting units under '{}' failed", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: DiscoveryError,
    },

    /// A task unit failed to load or its body failed
    #[error("task \"{task}\" execution error")]
    Execution {
        task: String,
        #[source]
        source: Box<RunnerError>,
    },

    /// A nested invocation made through a context handle failed
    #[error("{call} \"{task}\" error (called from {caller})")]
    Invocation {
        call: &'static str,
        task: String,
        caller: String,
        #[source]
        source: Box<RunnerError>,
    },

    /// A watcher unit failed while producing its descriptor
    #[error("watcher \"{watcher}\" failed")]
    Watcher {
        watcher: String,
        #[source]
        source: Box<RunnerError>,
    },

    /// A watcher unit returned a malformed descriptor
    #[error("watcher \"{watcher}\" returned an invalid descriptor: {reason}")]
    WatcherValidation { watcher: String, reason: String },

    /// The change-notification backend refused a watch
    #[error("failed to watch '{}'", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Unit-level failures (commands, interpolation, unit files)
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("config.tasks-path not defined")]
    MissingTasksPath,

    #[error("Failed to read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Path expansion errors raised while scanning a unit directory
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("path expansion was interrupted: {0}")]
    Interrupted(String),
}

/// Errors raised by unit files and the steps they run
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("cannot read unit file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid unit file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Interpreter is empty")]
    EmptyInterpreter,

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Invalid interpolation syntax: {0}")]
    InvalidSyntax(String),

    #[error("Interpolation nested too deeply in '{0}'")]
    RecursiveInterpolation(String),
}

impl From<InterpolationError> for RunnerError {
    fn from(err: InterpolationError) -> Self {
        RunnerError::Unit(UnitError::Interpolation(err))
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for unit operations
pub type UnitResult<T> = std::result::Result<T, UnitError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

/// Render an error and all of its sources on one line, outermost first
pub fn display_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
