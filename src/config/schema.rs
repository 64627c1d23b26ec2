//! Built-in settings and store construction
//!
//! Settings are layered (defaults, `os64.yml`, `.env`, process environment),
//! then every `{KEY}` reference between them is resolved once.

use crate::config::types::{Config, ConfigFile, BASE_DIR, DEFAULT_TASK};
use crate::error::{ConfigError, Result, TemplateError};
use crate::runner::interpolate::{expand_with, is_identifier, placeholders};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Prefix for environment variables overriding a setting, e.g. `OS64_CC`
pub const ENV_PREFIX: &str = "OS64_";

/// Built-in settings, before overrides
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("CC", "clang"),
    ("LD", "ld"),
    ("NASM", "nasm"),
    ("QEMU", "qemu-system-x86_64"),
    ("BUILD_DIR", "{BASE_DIR}/build"),
    ("MOUNT_DIR", "{BASE_DIR}/tmp/mnt"),
    ("DISK_IMAGE", "{BUILD_DIR}/disk.img"),
    ("DISK_FS_OFFSET", "1048576"),
    ("LOOP_DEVICE", "/dev/loop4"),
    ("SERIAL_OUT", "{BASE_DIR}/tmp/serial.out"),
    (
        "CFLAGS",
        "-std=c11 -march=x86-64 -mcmodel=large -mno-red-zone -mno-mmx -mno-sse \
         -mno-sse2 -ffreestanding -Wall -Wextra -pedantic -Wno-unused-parameter \
         -I{BASE_DIR}/include -I{BASE_DIR}/nf/include -O3",
    ),
    (
        "LDFLAGS",
        "-m elf_x86_64 -nostdlib -nodefaultlibs -T{BASE_DIR}/misc/kernel.ld",
    ),
];

/// Collects setting layers and produces a resolved [`Config`]
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    raw: BTreeMap<String, String>,
    default_task: Option<String>,
}

impl ConfigBuilder {
    /// Start from the built-in settings rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let mut raw: BTreeMap<String, String> = DEFAULT_SETTINGS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let base_dir: PathBuf = base_dir.into();
        raw.insert(BASE_DIR.to_string(), base_dir.display().to_string());

        ConfigBuilder {
            raw,
            default_task: None,
        }
    }

    /// Apply the settings and default task of a parsed `os64.yml`
    pub fn with_file(mut self, file: &ConfigFile) -> Result<Self> {
        for (key, value) in &file.settings {
            validate_key(key)?;
            self.raw.insert(key.clone(), value.clone());
        }

        if let Some(task) = &file.default_task {
            if task.trim().is_empty() {
                return Err(ConfigError::Invalid("default-task must not be empty".into()).into());
            }
            self.default_task = Some(task.clone());
        }

        Ok(self)
    }

    /// Apply `OS64_<KEY>` variables for keys that are already known
    ///
    /// Later entries win, so pass `.env` entries before the process environment.
    pub fn with_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if key == BASE_DIR {
                continue;
            }
            if let Some(slot) = self.raw.get_mut(key) {
                *slot = value;
            }
        }
        self
    }

    /// Resolve every setting and freeze the store
    pub fn build(self) -> Result<Config> {
        let mut resolved = BTreeMap::new();
        for key in self.raw.keys() {
            let mut stack = Vec::new();
            resolve_setting(key, &self.raw, &mut resolved, &mut stack)?;
        }

        let default_task = self
            .default_task
            .unwrap_or_else(|| DEFAULT_TASK.to_string());

        Ok(Config::from_resolved(resolved, default_task))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key == BASE_DIR {
        return Err(ConfigError::Invalid(format!(
            "{} is set from the command line and cannot be overridden",
            BASE_DIR
        ))
        .into());
    }
    if !is_identifier(key) {
        return Err(ConfigError::Invalid(format!("invalid setting name '{}'", key)).into());
    }
    Ok(())
}

/// Resolve one setting, depth-first through the settings it references
fn resolve_setting(
    key: &str,
    raw: &BTreeMap<String, String>,
    resolved: &mut BTreeMap<String, String>,
    stack: &mut Vec<String>,
) -> Result<String> {
    if let Some(value) = resolved.get(key) {
        return Ok(value.clone());
    }

    if let Some(start) = stack.iter().position(|k| k == key) {
        let mut chain = stack[start..].to_vec();
        chain.push(key.to_string());
        return Err(ConfigError::CircularReference(key.to_string(), chain.join(" -> ")).into());
    }

    let template = raw
        .get(key)
        .ok_or_else(|| TemplateError::MissingKey(key.to_string()))?;

    stack.push(key.to_string());

    let mut refs = HashMap::new();
    for name in placeholders(template) {
        let value = resolve_setting(name, raw, resolved, stack)?;
        refs.insert(name.to_string(), value);
    }

    stack.pop();

    let value = expand_with(template, |name| refs.get(name).cloned())?;
    resolved.insert(key.to_string(), value.clone());
    Ok(value)
}
