// src/exec/backend.rs

//! Pluggable process launcher.
//!
//! The lifecycle coordinator talks to a `ProcessLauncher` instead of
//! spawning processes itself. Production code uses [`RealProcessLauncher`];
//! tests can provide a launcher that records launches and decides exit
//! outcomes without touching the OS.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::process::run_inherited;
use super::ExitOutcome;

/// Future returned by [`ProcessLauncher::launch`].
pub type LaunchFuture = Pin<Box<dyn Future<Output = anyhow::Result<ExitOutcome>> + Send + 'static>>;

/// Trait abstracting how the built executable is started.
pub trait ProcessLauncher: Send + Sync {
    /// Start `argv` and resolve once it exits.
    ///
    /// Cancelling `scope` must stop the process; the future then resolves
    /// to [`ExitOutcome::Cancelled`].
    fn launch(&self, argv: Vec<String>, scope: CancellationToken) -> LaunchFuture;
}

/// Launcher that spawns a real OS process with inherited stdio.
#[derive(Debug, Clone, Default)]
pub struct RealProcessLauncher;

impl ProcessLauncher for RealProcessLauncher {
    fn launch(&self, argv: Vec<String>, scope: CancellationToken) -> LaunchFuture {
        Box::pin(async move {
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| anyhow!("cannot launch an empty command line"))?;

            let mut cmd = Command::new(program);
            cmd.args(args);
            run_inherited(cmd, &scope).await
        })
    }
}
