//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, help generation (including the
//! task listing) and shell completion.

pub mod app;

// Re-export main types
pub use app::*;
