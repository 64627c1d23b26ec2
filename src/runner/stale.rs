//! Staleness checks for build artifacts
//!
//! Decides whether an output has to be rebuilt by comparing filesystem
//! modification times. Nothing is cached: every query goes to the filesystem.

use crate::error::{ExecutionError, Result};
use crate::runner::{escape, Expander};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Answers existence and freshness questions about templated paths
#[derive(Debug, Clone, Copy)]
pub struct Oracle<'a> {
    expander: Expander<'a>,
}

impl<'a> Oracle<'a> {
    pub fn new(expander: Expander<'a>) -> Self {
        Oracle { expander }
    }

    /// Whether the expanded path is present
    pub fn exists(&self, path: &str) -> Result<bool> {
        let path = self.expander.expand(path)?;
        Ok(Path::new(&path).exists())
    }

    /// Modification time of the expanded path
    pub fn modification_time(&self, path: &str) -> Result<SystemTime> {
        let path = PathBuf::from(self.expander.expand(path)?);
        mtime(&path)
    }

    /// Whether `target` exists and is strictly newer than every source
    ///
    /// A target whose mtime equals the newest source counts as stale.
    pub fn is_up_to_date<S: AsRef<str>>(&self, target: &str, sources: &[S]) -> Result<bool> {
        if sources.is_empty() {
            return Err(ExecutionError::NoSources(target.to_string()).into());
        }

        if !self.exists(target)? {
            return Ok(false);
        }

        let mut newest_source: Option<SystemTime> = None;
        for source in sources {
            let modified = self.modification_time(source.as_ref())?;
            newest_source = newest_source.max(Some(modified));
        }

        Ok(Some(self.modification_time(target)?) > newest_source)
    }

    /// Paths matching the expanded pattern
    ///
    /// The pattern is checked now; the filesystem is walked each time the
    /// result is iterated.
    pub fn glob(&self, pattern: &str) -> Result<Glob> {
        let pattern = self.expander.expand(pattern)?;
        glob::Pattern::new(&pattern).map_err(|e| ExecutionError::Pattern {
            pattern: pattern.clone(),
            error: e.to_string(),
        })?;
        Ok(Glob { pattern })
    }
}

fn mtime(path: &Path) -> Result<SystemTime> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ExecutionError::PathNotFound(path.to_path_buf()).into(),
        _ => crate::error::BuildError::Io(e),
    })?;
    Ok(metadata.modified()?)
}

/// A validated glob pattern that can be iterated any number of times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glob {
    pattern: String,
}

impl Glob {
    /// Walk the filesystem for matches; unreadable entries are skipped
    pub fn iter(&self) -> GlobIter {
        // The pattern was validated in `Oracle::glob`.
        let paths = glob::glob(&self.pattern).ok();
        GlobIter { paths }
    }

    /// Collect matches as templates, with braces in file names escaped
    pub fn to_strings(&self) -> Vec<String> {
        self.iter()
            .map(|p| escape(&p.display().to_string()))
            .collect()
    }
}

impl<'g> IntoIterator for &'g Glob {
    type Item = PathBuf;
    type IntoIter = GlobIter;

    fn into_iter(self) -> GlobIter {
        self.iter()
    }
}

/// Lazy iterator over glob matches
pub struct GlobIter {
    paths: Option<glob::Paths>,
}

impl Iterator for GlobIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        let paths = self.paths.as_mut()?;
        paths.by_ref().find_map(|entry| entry.ok())
    }
}
