//! Task registry
//!
//! Maps task names to tasks. Names are unique, prerequisites must name
//! registered tasks, and prerequisite chains must not loop back on themselves.

use crate::error::{ConfigError, ConfigResult};
use crate::runner::{Task, TaskDef};
use std::collections::{BTreeMap, HashSet};

/// Name-ordered collection of tasks, read-only once validated
#[derive(Debug, Default)]
pub struct Registry {
    tasks: BTreeMap<String, Task>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register every entry of a task table and validate the result
    pub fn from_defs(defs: &[TaskDef]) -> ConfigResult<Self> {
        let mut registry = Registry::new();
        for def in defs {
            registry.register(Task::from(def))?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Add a task; a second task with the same name is rejected
    pub fn register(&mut self, task: Task) -> ConfigResult<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(ConfigError::DuplicateTask(task.name));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    /// Check prerequisite references and reject dependency cycles
    pub fn validate(&self) -> ConfigResult<()> {
        for task in self.tasks.values() {
            for prerequisite in &task.prerequisites {
                if !self.tasks.contains_key(prerequisite) {
                    return Err(ConfigError::UnknownPrerequisite {
                        task: task.name.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        for name in self.tasks.keys() {
            let mut stack = Vec::new();
            self.check_cycle(name, &mut visited, &mut stack)?;
        }

        Ok(())
    }

    fn check_cycle<'r>(
        &'r self,
        name: &'r str,
        visited: &mut HashSet<&'r str>,
        stack: &mut Vec<&'r str>,
    ) -> ConfigResult<()> {
        if stack.contains(&name) {
            stack.push(name);
            return Err(ConfigError::CircularDependency(stack.join(" -> ")));
        }

        if visited.contains(name) {
            return Ok(());
        }

        let Some(task) = self.tasks.get(name) else {
            return Ok(());
        };

        stack.push(name);
        for prerequisite in &task.prerequisites {
            self.check_cycle(prerequisite, visited, stack)?;
        }
        stack.pop();
        visited.insert(name);

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in name order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Task listing for help output, one `name - description` line per task
    pub fn help_text(&self) -> String {
        let mut text = String::from("available tasks:\n");
        for task in self.iter() {
            text.push_str(&format!("  {:<12} - {}\n", task.name, task.description));
        }
        text
    }
}
