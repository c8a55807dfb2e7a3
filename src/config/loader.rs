// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::BuildFile;
use crate::config::validate::validate_build_file;
use crate::errors::{Result, WatchbuildError};

/// Load a settings file from a given path and return the raw `BuildFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<BuildFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        WatchbuildError::ConfigError(format!("reading settings file at {:?}: {}", path, e))
    })?;

    let file: BuildFile = toml::from_str(&contents)?;
    Ok(file)
}

/// Load a settings file from path and run validation.
///
/// Semantic problems (no steps, duplicate names, bad globs, bad durations)
/// are reported as [`WatchbuildError::ConfigError`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildFile> {
    let file = load_from_path(&path)?;
    validate_build_file(&file).map_err(|e| WatchbuildError::ConfigError(format!("{e:#}")))?;
    Ok(file)
}

/// Directory that relative paths in a settings file are resolved against.
///
/// - If the settings path has a non-empty parent (e.g. "ci/Watchbuild.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current directory.
pub fn settings_root_dir(settings_path: &Path) -> PathBuf {
    match settings_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
