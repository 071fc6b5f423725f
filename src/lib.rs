//! dirrun - a directory-convention task runner
//!
//! Tasks are YAML units found by their place in a directory tree. A task can
//! invoke other tasks as children or peers, and watcher units can bind
//! filesystem events to task-like callbacks.

use std::future::Future;
use std::pin::Pin;

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod store;
pub mod unit;
pub mod watcher;

// Re-export commonly used types
pub use config::Settings;
pub use error::{Result, RunnerError};
pub use input::ProcessInput;
pub use runner::{ExecutionContext, Runner, RunnerBuilder};

/// Boxed, sendable future used at every async trait seam
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Current version of dirrun
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
