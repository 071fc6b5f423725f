//! Watch options: engine defaults merged with operator overrides

use crate::config::WatchConfig;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hidden files and everything inside hidden directories
pub const DEFAULT_IGNORED: &[&str] = &["**/.*", "**/.*/**"];

/// Polling interval used when polling is enabled without an interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    /// Globs matched against event paths relative to the watched path
    pub ignored: Vec<String>,

    /// Keep the process alive while watching
    pub persistent: bool,

    /// Poll instead of native notifications
    pub use_polling: bool,

    /// Polling interval
    pub interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            ignored: DEFAULT_IGNORED.iter().map(|p| p.to_string()).collect(),
            persistent: true,
            use_polling: false,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WatchOptions {
    /// Operator settings win field by field; unset fields keep the defaults
    pub fn merged(config: &WatchConfig) -> Self {
        let defaults = WatchOptions::default();
        WatchOptions {
            ignored: config.ignored.clone().unwrap_or(defaults.ignored),
            persistent: config.persistent.unwrap_or(defaults.persistent),
            use_polling: config.use_polling.unwrap_or(defaults.use_polling),
            interval: config
                .interval
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
        }
    }

    /// Compile the ignore globs for a set of watched roots
    pub fn ignore_filter(&self, roots: &[PathBuf]) -> Result<IgnoreFilter, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignored {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
        }
        Ok(IgnoreFilter {
            set: builder.build()?,
            roots: roots.to_vec(),
        })
    }
}

/// Decides whether an event path is dropped
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    set: GlobSet,
    roots: Vec<PathBuf>,
}

impl IgnoreFilter {
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        !relative.as_os_str().is_empty() && self.set.is_match(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WatchOptions::default();
        assert!(options.persistent);
        assert!(!options.use_polling);
        assert_eq!(options.ignored, vec!["**/.*", "**/.*/**"]);
    }

    #[test]
    fn test_merge_keeps_unset_defaults() {
        let config = WatchConfig {
            use_polling: Some(true),
            interval: Some(500),
            ..WatchConfig::default()
        };
        let options = WatchOptions::merged(&config);

        assert!(options.use_polling);
        assert_eq!(options.interval, Duration::from_millis(500));
        assert!(options.persistent);
        assert_eq!(options.ignored, WatchOptions::default().ignored);
    }

    #[test]
    fn test_merge_replaces_ignored() {
        let config = WatchConfig {
            ignored: Some(vec!["**/*.tmp".to_string()]),
            persistent: Some(false),
            ..WatchConfig::default()
        };
        let options = WatchOptions::merged(&config);

        assert_eq!(options.ignored, vec!["**/*.tmp"]);
        assert!(!options.persistent);
    }

    #[test]
    fn test_hidden_paths_ignored_relative_to_root() {
        let root = PathBuf::from("/work/.cache/project/src");
        let filter = WatchOptions::default().ignore_filter(&[root]).unwrap();

        assert!(!filter.is_ignored(Path::new("/work/.cache/project/src/main.rs")));
        assert!(!filter.is_ignored(Path::new("/work/.cache/project/src/app/mod.rs")));
        assert!(filter.is_ignored(Path::new("/work/.cache/project/src/.env")));
        assert!(filter.is_ignored(Path::new("/work/.cache/project/src/.git/HEAD")));
        assert!(filter.is_ignored(Path::new("/work/.cache/project/src/app/.swp")));
    }

    #[test]
    fn test_watched_root_itself_is_never_ignored() {
        let root = PathBuf::from("/work/.env");
        let filter = WatchOptions::default().ignore_filter(&[root.clone()]).unwrap();
        assert!(!filter.is_ignored(&root));
    }
}
