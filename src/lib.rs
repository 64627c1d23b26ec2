//! os64-make - incremental build-task engine for the os64 kernel
//!
//! Tasks are plain functions registered in a static table. Each one may
//! declare prerequisites, decides from file modification times whether its
//! outputs are stale, and shells out to external tools through a command
//! runner that echoes every command before executing it.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod tasks;
pub mod ui;

// Re-export commonly used types
pub use error::{BuildError, Result};

/// Current version of os64-make
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
