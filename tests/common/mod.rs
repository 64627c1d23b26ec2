//! Common test utilities

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Create an empty project root
pub fn create_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Create a project root containing an os64.yml file
pub fn create_project_with_config(content: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("os64.yml"), content).unwrap();
    temp_dir
}

/// Create `path` (and its parents) with a modification time of `secs` after the epoch
pub fn touch_at(path: &Path, secs: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}
