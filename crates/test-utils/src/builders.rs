use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use watchbuild::config::{CompileConfig, WatchList};
use watchbuild::engine::{Build, BuildStep, CompileFuture, CompileJob};

/// Ordered record of compile invocations, shared by every job of a build.
#[derive(Debug, Clone, Default)]
pub struct CompileLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CompileLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Return the recorded calls and start over.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    fn push(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

/// A compile job that:
/// - records each invocation in a [`CompileLog`]
/// - succeeds, or fails while its failure switch is on
/// - remembers the last `CompileConfig` it was given.
#[derive(Debug, Clone)]
pub struct RecordingJob {
    name: String,
    log: CompileLog,
    failing: Arc<AtomicBool>,
    last_config: Arc<Mutex<Option<CompileConfig>>>,
}

impl RecordingJob {
    pub fn new(name: &str, log: CompileLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            failing: Arc::new(AtomicBool::new(false)),
            last_config: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn last_config(&self) -> Option<CompileConfig> {
        self.last_config.lock().unwrap().clone()
    }
}

impl CompileJob for RecordingJob {
    fn compile(&self, _cancel: CancellationToken, conf: CompileConfig) -> CompileFuture<'_> {
        self.log.push(&self.name);
        *self.last_config.lock().unwrap() = Some(conf);
        let failing = self.failing.load(Ordering::SeqCst);
        let name = self.name.clone();

        Box::pin(async move {
            if failing {
                Err(anyhow!("{name} failed to compile"))
            } else {
                Ok(())
            }
        })
    }
}

/// A build made of [`RecordingJob`]s plus handles to inspect them.
pub struct RecordingBuild {
    pub build: Build,
    pub log: CompileLog,
    jobs: Vec<RecordingJob>,
}

impl RecordingBuild {
    pub fn job(&self, index: usize) -> &RecordingJob {
        &self.jobs[index]
    }
}

/// Builder for [`RecordingBuild`] to simplify test setup.
pub struct RecordingBuildBuilder {
    executable: String,
    steps: Vec<(String, WatchList)>,
}

impl RecordingBuildBuilder {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, name: &str, watch: WatchList) -> Self {
        self.steps.push((name.to_string(), watch));
        self
    }

    /// Step watching a single directory with no filter.
    pub fn dir_step(self, name: &str, dir: &str) -> Self {
        self.step(name, WatchList::new([dir]))
    }

    pub fn build(self) -> RecordingBuild {
        let log = CompileLog::default();
        let mut build = Build::new(self.executable);
        let mut jobs = Vec::new();

        for (name, watch) in self.steps {
            let job = RecordingJob::new(&name, log.clone());
            build = build.step(BuildStep::new(name, watch, job.clone()));
            jobs.push(job);
        }

        RecordingBuild { build, log, jobs }
    }
}
