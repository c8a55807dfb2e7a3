// src/config/mod.rs

//! Configuration for watchbuild.
//!
//! Responsibilities:
//! - Define the values handed to build steps and the run options (`model.rs`).
//! - Load the standalone binary's settings file from disk (`loader.rs`).
//! - Validate a loaded settings file (`validate.rs`).
//! - Discover the package version from git (`version.rs`).

pub mod loader;
pub mod model;
pub mod validate;
pub mod version;

pub use loader::{load_and_validate, load_from_path, settings_root_dir};
pub use model::{
    BuildFile, CompileConfig, ConfigSection, DefaultSection, RunOptions, StepConfig, WatchList,
    DEFAULT_POLL_INTERVAL, UNKNOWN_VERSION,
};
pub use validate::validate_build_file;
pub use version::discover_version;
