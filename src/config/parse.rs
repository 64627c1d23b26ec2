//! Configuration file discovery and parsing

use crate::config::types::ConfigFile;
use crate::error::{ConfigError, ConfigResult, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["os64.yml", "os64.yaml"];

/// Name of the optional environment file in the project root
const ENV_FILE_NAME: &str = ".env";

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Look for a configuration file in `dir` only
pub fn find_config_file_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<ConfigFile> {
    if yaml.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Read `KEY=value` pairs from `<dir>/.env` without touching the process environment
///
/// A missing file yields no entries.
pub fn read_env_file(dir: &Path) -> ConfigResult<Vec<(String, String)>> {
    let path = dir.join(ENV_FILE_NAME);
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let to_error = |e: dotenvy::Error| ConfigError::File {
        path: path.clone(),
        error: e.to_string(),
    };

    dotenvy::from_path_iter(&path)
        .map_err(to_error)?
        .map(|item| item.map_err(to_error))
        .collect()
}
