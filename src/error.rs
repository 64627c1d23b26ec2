//! Error types for os64-make

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type
#[derive(Error, Debug)]
pub enum BuildError {
    /// Configuration and registry errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template expansion errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Task execution errors
    #[error("{0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration store and task registry errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' is registered more than once")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on unknown task '{prerequisite}'")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Setting '{0}' refers to itself: {1}")]
    CircularReference(String, String),

    #[error("Failed to read '{path}': {error}")]
    File { path: PathBuf, error: String },
}

/// Template expansion errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Key '{0}' is not defined")]
    MissingKey(String),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Command failed with exit code {}: {command}", display_code(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Failed to start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Failed to access '{}': {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Source is outside the project root: {}", .0.display())]
    OutsideBaseDir(PathBuf),

    #[error("No sources given for target '{0}'")]
    NoSources(String),

    #[error("Invalid glob pattern '{pattern}': {error}")]
    Pattern { pattern: String, error: String },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for template expansion
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;
