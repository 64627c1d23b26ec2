//! Task definitions
//!
//! A task is a named unit of build work. Handlers are plain functions named
//! `task_<ident>`; the [`task_def!`](crate::task_def) macro turns such a
//! function into a [`TaskDef`] so the task name always follows the function
//! name.

use crate::error::Result;
use crate::runner::Context;
use std::fmt;

/// Prefix every task handler function carries
pub const HANDLER_PREFIX: &str = "task_";

/// Signature of a task body
pub type Action = Box<dyn Fn(&Context) -> Result<()>>;

/// Static description of a task, as listed in a task table
#[derive(Clone, Copy)]
pub struct TaskDef {
    /// Handler identifier, e.g. `task_kernel_objs`
    pub ident: &'static str,

    /// One-line description for help output
    pub about: &'static str,

    /// Display names of tasks that must run first
    pub prerequisites: &'static [&'static str],

    /// Handler
    pub handler: fn(&Context) -> Result<()>,
}

/// Build a [`TaskDef`] from a handler function
///
/// ```ignore
/// task_def!(task_kernel, "Build kernel image", after: ["kernel-objs", "nf-objs"])
/// ```
#[macro_export]
macro_rules! task_def {
    ($handler:ident, $about:expr) => {
        $crate::runner::TaskDef {
            ident: stringify!($handler),
            about: $about,
            prerequisites: &[],
            handler: $handler,
        }
    };
    ($handler:ident, $about:expr, after: [$($dep:expr),* $(,)?]) => {
        $crate::runner::TaskDef {
            ident: stringify!($handler),
            about: $about,
            prerequisites: &[$($dep),*],
            handler: $handler,
        }
    };
}

/// Derive a task's display name from its handler identifier
///
/// `task_kernel_objs` becomes `kernel-objs`.
pub fn display_name(ident: &str) -> String {
    ident
        .strip_prefix(HANDLER_PREFIX)
        .unwrap_or(ident)
        .replace('_', "-")
}

/// Runtime task representation
pub struct Task {
    /// Display name
    pub name: String,

    /// Help text
    pub description: String,

    /// Tasks to run before this one, in order
    pub prerequisites: Vec<String>,

    action: Action,
}

impl Task {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, action: F) -> Self
    where
        F: Fn(&Context) -> Result<()> + 'static,
    {
        Task {
            name: name.into(),
            description: description.into(),
            prerequisites: Vec::new(),
            action: Box::new(action),
        }
    }

    /// Declare tasks that must have run before this one
    pub fn after<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites
            .extend(prerequisites.into_iter().map(Into::into));
        self
    }

    /// Run the task body alone, without its prerequisites
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        (self.action)(ctx)
    }
}

impl From<&TaskDef> for Task {
    fn from(def: &TaskDef) -> Self {
        Task::new(display_name(def.ident), def.about, def.handler)
            .after(def.prerequisites.iter().copied())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::error::ExecutionError;

    fn task_kernel_objs(_ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn task_fail(_ctx: &Context) -> Result<()> {
        Err(ExecutionError::UnknownTask("inner".to_string()).into())
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("task_kernel_objs"), "kernel-objs");
        assert_eq!(display_name("task_clean"), "clean");
        assert_eq!(display_name("disk_image"), "disk-image");
    }

    #[test]
    fn test_task_def_macro() {
        let def = task_def!(task_kernel_objs, "Build kernel objects");
        assert_eq!(def.ident, "task_kernel_objs");
        assert!(def.prerequisites.is_empty());

        let def = task_def!(task_kernel_objs, "Build kernel objects", after: ["clean"]);
        assert_eq!(def.prerequisites, &["clean"]);
    }

    #[test]
    fn test_task_from_def() {
        let def = task_def!(task_kernel_objs, "Build kernel objects", after: ["a", "b"]);
        let task = Task::from(&def);

        assert_eq!(task.name, "kernel-objs");
        assert_eq!(task.description, "Build kernel objects");
        assert_eq!(task.prerequisites, vec!["a", "b"]);
    }

    #[test]
    fn test_execute_propagates_errors() {
        let config = ConfigBuilder::new("/p").build().unwrap();
        let ctx = Context::new(&config);

        let task = Task::from(&task_def!(task_fail, "Fails"));
        assert!(task.execute(&ctx).is_err());

        let task = Task::from(&task_def!(task_kernel_objs, "Succeeds"));
        assert!(task.execute(&ctx).is_ok());
    }
}
