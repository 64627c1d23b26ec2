//! Task execution engine
//!
//! This module handles template expansion, staleness checks, command
//! running, and registration and dispatch of tasks.

pub mod command;
pub mod context;
pub mod dispatch;
pub mod interpolate;
pub mod registry;
pub mod stale;
pub mod task;

// Re-export main types
pub use command::*;
pub use context::*;
pub use dispatch::*;
pub use interpolate::*;
pub use registry::*;
pub use stale::*;
pub use task::*;
