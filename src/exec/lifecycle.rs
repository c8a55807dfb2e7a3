// src/exec/lifecycle.rs

//! Owner of the (at most one) running instance of the built executable.
//!
//! The coordinator runs as its own Tokio task next to the poll loop. The only
//! thing the two share is a restart channel of capacity one: the poll loop
//! never waits on it, and extra signals sent while a restart is pending
//! collapse into that pending one.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, WatchbuildError};

use super::{ExitOutcome, ProcessLauncher};

/// Sending half of the restart channel, held by the poll loop.
#[derive(Debug, Clone)]
pub struct RestartSender {
    tx: mpsc::Sender<()>,
}

impl RestartSender {
    /// Ask for a restart without blocking.
    ///
    /// Returns `false` only if the coordinator is gone.
    pub fn signal(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("restart already pending; coalescing signal");
                true
            }
            Err(TrySendError::Closed(())) => {
                debug!("process coordinator has stopped; dropping restart signal");
                false
            }
        }
    }
}

/// Create the restart channel shared by the poll loop and the coordinator.
pub fn restart_channel() -> (RestartSender, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (RestartSender { tx }, rx)
}

/// A launched instance bound to its own cancellation scope.
struct Instance {
    generation: u64,
    scope: CancellationToken,
    handle: JoinHandle<anyhow::Result<ExitOutcome>>,
}

/// Starts, restarts and stops the built executable.
pub struct ProcessLifecycle {
    launcher: Arc<dyn ProcessLauncher>,
    argv: Vec<String>,
    generation: u64,
}

impl ProcessLifecycle {
    /// `argv` is `[executable, ...args]`.
    pub fn new(launcher: Arc<dyn ProcessLauncher>, argv: Vec<String>) -> Self {
        Self {
            launcher,
            argv,
            generation: 0,
        }
    }

    fn executable(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    /// Launch once and wait for the exit (non-watch mode).
    ///
    /// A non-success exit is fatal; being stopped by `cancel` is not.
    pub async fn run_once(mut self, cancel: CancellationToken) -> Result<()> {
        let instance = self.start(&cancel);
        let outcome = join(instance).await;
        self.final_result(settle(outcome, &cancel))
    }

    /// Coordinate instances until `cancel` fires.
    ///
    /// - `start_now`: launch immediately instead of waiting for the first
    ///   restart signal.
    /// - Each signal on `restart_rx` stops the current instance (if any),
    ///   waits for it to exit, then launches a fresh one.
    /// - An instance that exits on its own is logged; the next signal starts
    ///   a new one.
    ///
    /// Returns an error if the final instance exited on its own with a
    /// non-success status. Once `cancel` has fired, an instance killed by a
    /// signal counts as stopped: a terminal Ctrl-C reaches the child too.
    pub async fn run(
        mut self,
        cancel: CancellationToken,
        mut restart_rx: mpsc::Receiver<()>,
        start_now: bool,
    ) -> Result<()> {
        let mut current = if start_now {
            Some(self.start(&cancel))
        } else {
            None
        };
        let mut last_exit: Option<anyhow::Result<ExitOutcome>> = None;
        let mut accepting = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("top-level cancellation; shutting down process coordinator");
                    break;
                }

                signal = restart_rx.recv(), if accepting => match signal {
                    Some(()) => {
                        if let Some(instance) = current.take() {
                            info!(
                                executable = %self.executable(),
                                generation = instance.generation,
                                "restarting: stopping current instance"
                            );
                            let outcome = self.stop(instance).await;
                            log_outcome(self.executable(), &outcome);
                        }
                        last_exit = None;
                        current = Some(self.start(&cancel));
                    }
                    None => {
                        debug!("restart channel closed");
                        accepting = false;
                        if current.is_none() {
                            break;
                        }
                    }
                },

                outcome = wait_for_exit(&mut current) => {
                    current = None;
                    log_outcome(self.executable(), &outcome);
                    last_exit = Some(outcome);
                    if !accepting {
                        break;
                    }
                    info!(
                        executable = %self.executable(),
                        "waiting for the next successful build to restart"
                    );
                }
            }
        }

        let outcome = match current.take() {
            Some(instance) => Some(self.stop(instance).await),
            None => last_exit,
        };

        match outcome {
            Some(outcome) => self.final_result(settle(outcome, &cancel)),
            None => Ok(()),
        }
    }

    fn start(&mut self, parent: &CancellationToken) -> Instance {
        self.generation += 1;
        let scope = parent.child_token();

        info!(
            executable = %self.executable(),
            args = ?&self.argv[self.argv.len().min(1)..],
            generation = self.generation,
            "starting executable"
        );

        let launch = self.launcher.launch(self.argv.clone(), scope.clone());
        Instance {
            generation: self.generation,
            scope,
            handle: tokio::spawn(launch),
        }
    }

    /// Cancel the instance's scope and wait for it to report its exit.
    async fn stop(&self, instance: Instance) -> anyhow::Result<ExitOutcome> {
        instance.scope.cancel();
        join(instance).await
    }

    fn final_result(&self, outcome: anyhow::Result<ExitOutcome>) -> Result<()> {
        match outcome {
            Ok(ExitOutcome::Success) | Ok(ExitOutcome::Cancelled) => Ok(()),
            Ok(outcome) => Err(WatchbuildError::ProcessFailed {
                executable: self.executable().to_string(),
                outcome,
            }),
            Err(e) => Err(WatchbuildError::Other(
                e.context(format!("running '{}'", self.executable())),
            )),
        }
    }
}

/// Signal deaths during shutdown are ours, not the child's.
fn settle(
    outcome: anyhow::Result<ExitOutcome>,
    cancel: &CancellationToken,
) -> anyhow::Result<ExitOutcome> {
    match outcome {
        Ok(ExitOutcome::Terminated) if cancel.is_cancelled() => Ok(ExitOutcome::Cancelled),
        other => other,
    }
}

async fn join(instance: Instance) -> anyhow::Result<ExitOutcome> {
    match instance.handle.await {
        Ok(outcome) => outcome,
        Err(e) => Err(anyhow::anyhow!("launcher task failed: {e}")),
    }
}

/// Resolve when the current instance exits; pending forever if none.
async fn wait_for_exit(current: &mut Option<Instance>) -> anyhow::Result<ExitOutcome> {
    match current {
        Some(instance) => match (&mut instance.handle).await {
            Ok(outcome) => outcome,
            Err(e) => Err(anyhow::anyhow!("launcher task failed: {e}")),
        },
        None => std::future::pending().await,
    }
}

fn log_outcome(executable: &str, outcome: &anyhow::Result<ExitOutcome>) {
    match outcome {
        Ok(ExitOutcome::Success) => info!(%executable, "executable exited successfully"),
        Ok(ExitOutcome::Cancelled) => debug!(%executable, "executable stopped"),
        Ok(other) => warn!(%executable, outcome = %other, "executable exited abnormally"),
        Err(e) => error!(%executable, error = %e, "executable could not be run"),
    }
}
