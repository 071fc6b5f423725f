//! Common test utilities

#![allow(dead_code)]

use dirrun::error::DiscoveryError;
use dirrun::registry::{task_patterns, GlobExpander, PathExpander};
use dirrun::BoxFuture;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// A temporary project with a `tasks/` directory
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("tasks")).unwrap();
        Project { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks(&self) -> PathBuf {
        self.dir.path().join("tasks")
    }

    /// Write a file below `tasks/`, creating parent directories
    pub fn unit(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.tasks().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Write `dirrun.yml` at the project root
    pub fn config(&self, content: &str) -> PathBuf {
        let path = self.root().join("dirrun.yml");
        fs::write(&path, content).unwrap();
        path
    }
}

/// Glob expansion that counts task scans
#[derive(Default)]
pub struct CountingExpander {
    task_scans: AtomicUsize,
}

impl CountingExpander {
    pub fn task_scans(&self) -> usize {
        self.task_scans.load(Ordering::SeqCst)
    }
}

impl PathExpander for CountingExpander {
    fn expand(
        &self,
        patterns: &[String],
        base: &Path,
    ) -> BoxFuture<Result<Vec<PathBuf>, DiscoveryError>> {
        if patterns == task_patterns().as_slice() {
            self.task_scans.fetch_add(1, Ordering::SeqCst);
        }
        GlobExpander.expand(patterns, base)
    }
}

/// Poll `check` until it holds or the timeout passes
pub async fn wait_for<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Log lines written by a test-local tracing subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route tracing output of the current thread here until the guard drops
    ///
    /// Tasks spawned on a current-thread runtime log through it as well.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
