//! Task execution engine
//!
//! This module resolves task names, builds a fresh context per invocation
//! and runs units, including nested child and peer invocations.

pub mod context;
pub mod engine;

// Re-export main types
pub use context::*;
pub use engine::*;
