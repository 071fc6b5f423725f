//! Log output setup

use tracing_subscriber::EnvFilter;

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Print no output
    Silent,
    /// Only print command output and errors
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Verbose output
    Verbose,
}

impl Verbosity {
    /// Default filter directive for this level
    pub fn directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Build the filter: `RUST_LOG` when set, the verbosity level otherwise
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}

/// Install the global subscriber writing to stderr
///
/// Calling it again is harmless; the first subscriber stays in place.
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
