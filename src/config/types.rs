//! Core configuration types
//!
//! `ConfigFile` mirrors an `os64.yml` file on disk; `Config` is the resolved,
//! read-only settings store every component borrows during a run.

use crate::error::{TemplateError, TemplateResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Task run when no task names are given on the command line
pub const DEFAULT_TASK: &str = "install";

/// Key holding the project root
pub const BASE_DIR: &str = "BASE_DIR";

/// Top-level structure of an `os64.yml` file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Task to run when none is requested
    #[serde(
        rename = "default-task",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_task: Option<String>,

    /// Setting overrides, e.g. `CC: gcc`
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_settings"
    )]
    pub settings: BTreeMap<String, String>,
}

/// Resolved, immutable settings store
///
/// Built once by [`ConfigBuilder`](crate::config::ConfigBuilder). There are no
/// setters: every value is final by the time a task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
    default_task: String,
}

impl Config {
    pub(crate) fn from_resolved(values: BTreeMap<String, String>, default_task: String) -> Self {
        Config {
            values,
            default_task,
        }
    }

    /// Look up a setting
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a setting that must exist
    pub fn require(&self, key: &str) -> TemplateResult<&str> {
        self.get(key)
            .ok_or_else(|| TemplateError::MissingKey(key.to_string()))
    }

    /// The project root every relative setting hangs off
    pub fn base_dir(&self) -> &Path {
        Path::new(self.get(BASE_DIR).unwrap_or("."))
    }

    /// Name of the task to run when none is requested
    pub fn default_task(&self) -> &str {
        &self.default_task
    }
}

/// Accept strings, numbers and booleans as setting values
fn deserialize_settings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Mapping(map) => {
            let mut settings = BTreeMap::new();
            for (key, value) in map {
                let key = match key {
                    Value::String(s) => s,
                    _ => return Err(D::Error::custom("setting names must be strings")),
                };
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(D::Error::custom(format!(
                            "setting '{}' must be a string, number or boolean",
                            key
                        )))
                    }
                };
                settings.insert(key, value);
            }
            Ok(settings)
        }
        Value::Null => Ok(BTreeMap::new()),
        _ => Err(D::Error::custom("settings must be a mapping")),
    }
}
