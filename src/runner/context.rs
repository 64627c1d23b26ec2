//! Execution context for task running
//!
//! The context lends the settings store to every task body and carries the
//! output and execution switches chosen on the command line.

use crate::config::Config;
use crate::error::{Result, TemplateResult};
use crate::runner::{Cmd, Expander, Glob, Oracle, Overrides};
use crate::ui;
use std::path::PathBuf;

/// Execution context shared by all tasks of one run
pub struct Context<'a> {
    /// Settings store, read-only for the whole run
    pub config: &'a Config,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Echo commands without executing them
    pub dry_run: bool,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet = 0,
    Normal = 1,
    Verbose = 2,
}

impl<'a> Context<'a> {
    /// Create a new context with default settings
    pub fn new(config: &'a Config) -> Self {
        Context {
            config,
            verbosity: Verbosity::Normal,
            dry_run: false,
        }
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Echo commands instead of running them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn expander(&self) -> Expander<'a> {
        Expander::new(self.config)
    }

    pub fn oracle(&self) -> Oracle<'a> {
        Oracle::new(self.expander())
    }

    /// Expand a template against the settings store
    pub fn expand(&self, template: &str) -> TemplateResult<String> {
        self.expander().expand(template)
    }

    /// Expand a template with call-specific overrides
    pub fn expand_with(&self, template: &str, overrides: &Overrides) -> TemplateResult<String> {
        self.expander().expand_with_overrides(template, overrides)
    }

    /// Expand a template into a path
    pub fn path(&self, template: &str) -> TemplateResult<PathBuf> {
        self.expand(template).map(PathBuf::from)
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        self.oracle().exists(path)
    }

    /// Whether `target` is newer than every one of `sources`
    pub fn is_up_to_date<S: AsRef<str>>(&self, target: &str, sources: &[S]) -> Result<bool> {
        self.oracle().is_up_to_date(target, sources)
    }

    pub fn glob(&self, pattern: &str) -> Result<Glob> {
        self.oracle().glob(pattern)
    }

    /// Make sure a directory exists
    pub fn makedir(&self, path: &str) -> Result<()> {
        let path = self.path(path)?;
        if path.is_dir() {
            return Ok(());
        }
        self.print_debug(&format!("Creating directory {}", path.display()));
        if !self.dry_run {
            std::fs::create_dir_all(&path)?;
        }
        Ok(())
    }

    /// Expand, echo and execute a command
    pub fn run(&self, cmd: &Cmd) -> Result<()> {
        crate::runner::execute_command(cmd, self)
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            ui::info(message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        ui::error(message);
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            ui::debug(message);
        }
    }

    /// Print task start message
    pub fn print_task_start(&self, task_name: &str) {
        self.print_info(&format!("Running task: {}", task_name));
    }

    /// Print task complete message
    pub fn print_task_complete(&self, task_name: &str) {
        self.print_debug(&format!("Task completed: {}", task_name));
    }

    /// Print task skip message
    pub fn print_task_skip(&self, task_name: &str, reason: &str) {
        self.print_debug(&format!("Skipping task '{}': {}", task_name, reason));
    }
}
