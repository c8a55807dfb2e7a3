// src/engine/pipeline.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CompileConfig, RunOptions};
use crate::errors::{Result, WatchbuildError};
use crate::exec::{
    restart_channel, ProcessLauncher, ProcessLifecycle, RealProcessLauncher, RestartSender,
};
use crate::fs::FileSystem;
use crate::watch::{FileFilter, TreeHasher, WatchProfile};

use super::build::Build;
use super::status::{StatusBoard, StepStatus};

/// Result of compiling every step once, in order.
#[derive(Debug)]
pub enum FirstPass {
    Complete,
    /// Step `step` failed; later steps were not attempted.
    Failed { step: usize, error: WatchbuildError },
    /// Cancelled before every step ran.
    Cancelled,
}

/// What a single poll tick observed and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Steps whose tree hash changed.
    pub changed: Vec<usize>,
    /// Steps that recompiled successfully, in order.
    pub compiled: Vec<usize>,
    /// Step whose compile failed (processing stopped there).
    pub failed: Option<usize>,
    /// The last step recompiled successfully; the executable should restart.
    pub restart: bool,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.changed.is_empty() && self.compiled.is_empty() && self.failed.is_none()
    }
}

/// Drives the compile steps of a [`Build`]: one full pass, then (when
/// watching) a poll loop that recompiles what changed and asks the process
/// coordinator to restart the executable.
///
/// Compile callbacks and child processes have no timeout: a callback that
/// never returns stalls its tick, and with it the whole poll loop.
pub struct Pipeline {
    build: Build,
    profiles: Vec<WatchProfile>,
    conf: CompileConfig,
    options: RunOptions,
    hasher: TreeHasher,
    launcher: Arc<dyn ProcessLauncher>,
    board: Option<StatusBoard>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("build", &self.build)
            .field("conf", &self.conf)
            .field("options", &self.options)
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate the build and compile its watch lists.
    pub fn new(build: Build, conf: CompileConfig, options: RunOptions) -> Result<Self> {
        if build.steps.is_empty() {
            return Err(WatchbuildError::ConfigError(
                "a build needs at least one step".to_string(),
            ));
        }
        if options.run && build.executable.trim().is_empty() {
            return Err(WatchbuildError::ConfigError(
                "an executable name is required to run the build".to_string(),
            ));
        }
        if options.watch && options.poll_interval.is_zero() {
            return Err(WatchbuildError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let profiles = build
            .steps
            .iter()
            .map(|step| {
                WatchProfile::compile(&step.watch).map_err(|e| {
                    WatchbuildError::ConfigError(format!(
                        "watch list of step '{}': {e:#}",
                        step.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            build,
            profiles,
            conf,
            options,
            hasher: TreeHasher::default(),
            launcher: Arc::new(RealProcessLauncher),
            board: None,
        })
    }

    /// Hash through `fs` instead of the real filesystem.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.hasher = TreeHasher::new(fs);
        self
    }

    /// Launch the executable through `launcher`.
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn build(&self) -> &Build {
        &self.build
    }

    pub fn compile_config(&self) -> &CompileConfig {
        &self.conf
    }

    /// Step statuses of the current watch session, if one was started.
    pub fn statuses(&self) -> Option<&[StepStatus]> {
        self.board.as_ref().map(StatusBoard::statuses)
    }

    /// Argument vector of the executable: `[executable, ...args]`.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.build.executable.clone())
            .chain(self.options.args.iter().cloned())
            .collect()
    }

    /// Compile every step, then watch and/or run as requested, until done
    /// or until `cancel` fires.
    ///
    /// Fatal errors: a failed first pass when not watching, and a
    /// non-success exit of the last tracked instance of the executable.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            executable = %self.build.executable,
            steps = self.build.steps.len(),
            watch = self.options.watch,
            run = self.options.run,
            quick = self.conf.quick,
            "build started"
        );

        let broken_from = match self.first_pass(&cancel).await {
            FirstPass::Complete => None,
            FirstPass::Cancelled => {
                info!("build cancelled during first pass");
                return Ok(());
            }
            FirstPass::Failed { step, error } => {
                if !self.options.watch {
                    return Err(error);
                }
                error!(
                    step = %self.build.steps[step].name,
                    index = step,
                    error = %error,
                    "initial build failed; watching for changes"
                );
                Some(step)
            }
        };

        if !self.options.watch {
            if self.options.run {
                return ProcessLifecycle::new(self.launcher.clone(), self.argv())
                    .run_once(cancel)
                    .await;
            }
            info!("build finished");
            return Ok(());
        }

        self.start_watch(broken_from);

        let (restart_tx, coordinator) = if self.options.run {
            let (tx, rx) = restart_channel();
            let lifecycle = ProcessLifecycle::new(self.launcher.clone(), self.argv());
            let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, broken_from.is_none()));
            (Some(tx), Some(handle))
        } else {
            (None, None)
        };

        self.poll_loop(&cancel, restart_tx.as_ref()).await;
        drop(restart_tx);

        if let Some(handle) = coordinator {
            match handle.await {
                Ok(res) => res?,
                Err(e) => return Err(anyhow!("process coordinator task failed: {e}").into()),
            }
        }

        info!("watch stopped");
        Ok(())
    }

    /// Compile every step once, in order, stopping at the first failure.
    pub async fn first_pass(&self, cancel: &CancellationToken) -> FirstPass {
        for index in 0..self.build.steps.len() {
            if cancel.is_cancelled() {
                return FirstPass::Cancelled;
            }
            if let Err(error) = self.compile_step(index, cancel).await {
                // A step interrupted by shutdown did not fail.
                if cancel.is_cancelled() {
                    debug!(index, error = %error, "step interrupted by cancellation");
                    return FirstPass::Cancelled;
                }
                return FirstPass::Failed { step: index, error };
            }
        }
        FirstPass::Complete
    }

    /// Begin a watch session from the current tree hashes.
    ///
    /// `broken_from` marks that step and every later one broken, as after a
    /// failed first pass.
    pub fn start_watch(&mut self, broken_from: Option<usize>) {
        let hashes = self
            .profiles
            .iter()
            .map(|profile| self.hasher.hash(profile))
            .collect();

        let mut board = StatusBoard::new(hashes, self.conf.quick);
        if let Some(index) = broken_from {
            board.mark_broken_from(index);
        }
        for (index, profile) in self.profiles.iter().enumerate() {
            debug!(
                step = %self.build.steps[index].name,
                index,
                paths = ?profile.paths(),
                filter = ?profile.filter().map(FileFilter::patterns),
                "watching"
            );
        }
        debug!(states = ?board.states(), quick = board.quick(), "watch session started");
        self.board = Some(board);
    }

    /// One poll tick: re-hash every watch list, cascade changes, recompile
    /// dirty steps in order.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> TickReport {
        if self.board.is_none() {
            self.start_watch(None);
        }

        let mut report = TickReport::default();

        let hashes: Vec<_> = self
            .profiles
            .iter()
            .map(|profile| self.hasher.hash(profile))
            .collect();

        if let Some(board) = self.board.as_mut() {
            for (index, hash) in hashes.into_iter().enumerate() {
                if board.observe(index, hash) {
                    info!(
                        step = %self.build.steps[index].name,
                        index,
                        "source change detected"
                    );
                    report.changed.push(index);
                }
            }
        }

        let mut from = 0;
        while let Some(index) = self.board.as_ref().and_then(|b| b.next_dirty(from)) {
            if cancel.is_cancelled() {
                debug!("cancelled; leaving remaining dirty steps for later");
                break;
            }
            from = index + 1;

            if let Some(board) = self.board.as_mut() {
                board.begin_compile(index);
            }
            info!(step = %self.build.steps[index].name, index, "recompiling");

            let result = self.compile_step(index, cancel).await;
            let Some(board) = self.board.as_mut() else {
                break;
            };

            match result {
                Ok(()) => {
                    board.record_success(index);
                    report.compiled.push(index);
                    if board.is_last(index) {
                        report.restart = true;
                    }
                }
                Err(e) if cancel.is_cancelled() => {
                    // Interrupted, not failed: compile it again next session.
                    board.requeue(index);
                    debug!(step = %self.build.steps[index].name, index, error = %e, "rebuild interrupted by cancellation");
                    break;
                }
                Err(e) => {
                    board.record_failure(index);
                    error!(step = %self.build.steps[index].name, index, error = %e, "rebuild failed");
                    report.failed = Some(index);
                    break;
                }
            }
        }

        report
    }

    async fn poll_loop(&mut self, cancel: &CancellationToken, restart: Option<&RestartSender>) {
        info!(interval = ?self.options.poll_interval, "watching for source changes");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }

            let report = self.tick(cancel).await;
            if !report.restart {
                continue;
            }
            match restart {
                Some(tx) => {
                    if !tx.signal() {
                        warn!("process coordinator is gone; restart not delivered");
                    }
                }
                None => debug!("build complete; nothing to restart"),
            }
        }
    }

    async fn compile_step(&self, index: usize, cancel: &CancellationToken) -> Result<()> {
        let step = &self.build.steps[index];
        debug!(step = %step.name, index, "compiling step");

        step.job
            .compile(cancel.child_token(), self.conf.clone())
            .await
            .map_err(|e| WatchbuildError::compile_failed(step.name.clone(), e))
    }
}
