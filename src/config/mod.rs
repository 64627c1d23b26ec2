//! Configuration store
//!
//! This module handles discovery and parsing of `os64.yml` files and
//! construction of the immutable settings store shared by every task.

pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
