// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] spawns children with inherited stdio (`passthru`).
//! - [`backend`] provides the `ProcessLauncher` trait and the production
//!   `RealProcessLauncher`; tests replace it with a fake.
//! - [`lifecycle`] owns the running instance of the built executable and
//!   restarts it on request.
//! - [`shell`] is a compile step that runs a shell command.

use std::fmt;
use std::process::ExitStatus;

pub mod backend;
pub mod lifecycle;
pub mod process;
pub mod shell;

pub use backend::{LaunchFuture, ProcessLauncher, RealProcessLauncher};
pub use lifecycle::{restart_channel, ProcessLifecycle, RestartSender};
pub use process::passthru;
pub use shell::ShellJob;

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Exited on its own with a non-zero code.
    Failed(i32),
    /// Ended without an exit code (e.g. killed by a signal).
    Terminated,
    /// Stopped by us through its cancellation scope.
    Cancelled,
}

impl ExitOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            ExitOutcome::Success
        } else {
            match status.code() {
                Some(code) => ExitOutcome::Failed(code),
                None => ExitOutcome::Terminated,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Success => write!(f, "exited successfully"),
            ExitOutcome::Failed(code) => write!(f, "exited with exit code {code}"),
            ExitOutcome::Terminated => write!(f, "was terminated without an exit code"),
            ExitOutcome::Cancelled => write!(f, "was stopped"),
        }
    }
}
