// src/engine/build.rs

//! Caller-facing description of a build: the executable and its ordered
//! compile steps.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{CompileConfig, WatchList};

/// Future returned by a [`CompileJob`].
pub type CompileFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A single compile step.
///
/// Implementations must be idempotent for identical inputs and must not keep
/// the cancellation token past the returned future. Writing build artifacts
/// is entirely up to the implementation.
///
/// Any `Fn(CancellationToken, CompileConfig) -> impl Future` closure is a
/// `CompileJob`; use [`BuildStep::from_fn`] to get closure parameter types
/// inferred.
pub trait CompileJob: Send + Sync {
    fn compile(&self, cancel: CancellationToken, conf: CompileConfig) -> CompileFuture<'_>;
}

impl<F, Fut> CompileJob for F
where
    F: Fn(CancellationToken, CompileConfig) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn compile(&self, cancel: CancellationToken, conf: CompileConfig) -> CompileFuture<'_> {
        Box::pin(self(cancel, conf))
    }
}

/// One watch list paired with the job that compiles it.
#[derive(Clone)]
pub struct BuildStep {
    pub name: String,
    pub watch: WatchList,
    pub job: Arc<dyn CompileJob>,
}

impl fmt::Debug for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildStep")
            .field("name", &self.name)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl BuildStep {
    pub fn new(name: impl Into<String>, watch: WatchList, job: impl CompileJob + 'static) -> Self {
        Self {
            name: name.into(),
            watch,
            job: Arc::new(job),
        }
    }

    /// Build a step from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, watch: WatchList, f: F) -> Self
    where
        F: Fn(CancellationToken, CompileConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(name, watch, f)
    }
}

/// The executable name plus its ordered build steps.
///
/// Step order is the only notion of dependency: a step may use the output of
/// any step before it.
#[derive(Debug, Clone, Default)]
pub struct Build {
    pub executable: String,
    pub steps: Vec<BuildStep>,
}

impl Build {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step; it runs after every step added before it.
    pub fn step(mut self, step: BuildStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}
