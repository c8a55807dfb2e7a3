// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::exec::ExitOutcome;

#[derive(Error, Debug)]
pub enum WatchbuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid file filter: {0}")]
    Pattern(#[from] globset::Error),

    /// A compile callback returned an error.
    #[error("compile step '{step}' failed: {source}")]
    CompileFailed {
        step: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The last tracked instance of the executable did not exit cleanly.
    #[error("process '{executable}' {outcome}")]
    ProcessFailed {
        executable: String,
        outcome: ExitOutcome,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchbuildError {
    pub fn compile_failed(step: impl Into<String>, err: anyhow::Error) -> Self {
        WatchbuildError::CompileFailed {
            step: step.into(),
            source: err.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchbuildError>;
