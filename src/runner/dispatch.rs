//! Task dispatch
//!
//! Runs requested tasks in order. Each task's prerequisites run first,
//! depth-first, and no task runs twice within one dispatch.

use crate::error::{ExecutionError, Result};
use crate::runner::{Context, Registry, Task};
use std::collections::HashSet;

/// Where a dispatcher is in its run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing has run yet
    Idle,
    /// The named task is executing
    Running(String),
    /// Every requested task finished
    Done,
    /// A task or lookup failed; nothing further runs
    Failed,
}

/// Runs tasks from a registry
pub struct Dispatcher<'r> {
    registry: &'r Registry,
    visited: HashSet<String>,
    state: DispatchState,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Dispatcher {
            registry,
            visited: HashSet::new(),
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    /// Run `requested` in order; an empty list runs the configured default task
    ///
    /// Stops at the first unknown name or failing task.
    pub fn dispatch<S: AsRef<str>>(&mut self, requested: &[S], ctx: &Context) -> Result<()> {
        let names: Vec<&str> = if requested.is_empty() {
            vec![ctx.config.default_task()]
        } else {
            requested.iter().map(|s| s.as_ref()).collect()
        };

        let registry = self.registry;
        for name in names {
            let Some(task) = registry.get(name) else {
                self.state = DispatchState::Failed;
                return Err(ExecutionError::UnknownTask(name.to_string()).into());
            };

            if let Err(e) = self.run_with_prerequisites(task, ctx) {
                self.state = DispatchState::Failed;
                return Err(e);
            }
        }

        self.state = DispatchState::Done;
        Ok(())
    }

    fn run_with_prerequisites(&mut self, task: &'r Task, ctx: &Context) -> Result<()> {
        if !self.visited.insert(task.name.clone()) {
            ctx.print_task_skip(&task.name, "already ran");
            return Ok(());
        }

        let registry = self.registry;
        for prerequisite in &task.prerequisites {
            let dep = registry
                .get(prerequisite)
                .ok_or_else(|| ExecutionError::UnknownTask(prerequisite.clone()))?;
            self.run_with_prerequisites(dep, ctx)?;
        }

        self.state = DispatchState::Running(task.name.clone());
        ctx.print_task_start(&task.name);
        if let Err(e) = task.execute(ctx) {
            ctx.print_error(&format!("Task '{}' failed", task.name));
            return Err(e);
        }
        ctx.print_task_complete(&task.name);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::error::BuildError;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recording(name: &str, log: &Log) -> Task {
        let log = Rc::clone(log);
        let entry = name.to_string();
        Task::new(name, "records itself", move |_| {
            log.borrow_mut().push(entry.clone());
            Ok(())
        })
    }

    #[test]
    fn test_prerequisites_run_first_and_once() {
        let log = Log::default();
        let mut registry = Registry::new();
        registry.register(recording("objs", &log)).unwrap();
        registry
            .register(recording("kernel", &log).after(["objs"]))
            .unwrap();
        registry
            .register(recording("images", &log).after(["objs"]))
            .unwrap();
        registry
            .register(recording("install", &log).after(["kernel", "images"]))
            .unwrap();
        registry.validate().unwrap();

        let config = ConfigBuilder::new("/p").build().unwrap();
        let ctx = Context::new(&config);
        let mut dispatcher = Dispatcher::new(&registry);

        dispatcher.dispatch(&["install", "kernel"], &ctx).unwrap();

        assert_eq!(*log.borrow(), vec!["objs", "kernel", "images", "install"]);
        assert_eq!(dispatcher.state(), &DispatchState::Done);
    }

    #[test]
    fn test_failing_task_sets_failed_state() {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .register(Task::new("broken", "fails", |_| {
                Err(ExecutionError::CommandFailed {
                    command: "false".to_string(),
                    code: Some(1),
                }
                .into())
            }))
            .unwrap();
        registry.register(recording("after", &log)).unwrap();

        let config = ConfigBuilder::new("/p").build().unwrap();
        let ctx = Context::new(&config);
        let mut dispatcher = Dispatcher::new(&registry);

        let result = dispatcher.dispatch(&["broken", "after"], &ctx);
        assert!(matches!(
            result,
            Err(BuildError::Execution(ExecutionError::CommandFailed { .. }))
        ));
        assert_eq!(dispatcher.state(), &DispatchState::Failed);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_new_dispatcher_is_idle() {
        let registry = Registry::new();
        let dispatcher = Dispatcher::new(&registry);
        assert_eq!(dispatcher.state(), &DispatchState::Idle);
    }
}
