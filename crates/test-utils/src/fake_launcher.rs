use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use watchbuild::exec::{ExitOutcome, LaunchFuture, ProcessLauncher};

#[derive(Default)]
struct FakeState {
    launches: Vec<Vec<String>>,
    exits: Vec<Option<oneshot::Sender<ExitOutcome>>>,
    stopped: usize,
    immediate: Option<ExitOutcome>,
}

/// A fake launcher that:
/// - records the argv of every launch
/// - keeps each instance "running" until its scope is cancelled (counted as
///   stopped) or the test makes it exit with [`FakeLauncher::exit`].
///
/// With [`FakeLauncher::exiting_with`], every instance exits immediately.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<FakeState>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exiting_with(outcome: ExitOutcome) -> Self {
        let launcher = Self::default();
        launcher.state.lock().unwrap().immediate = Some(outcome);
        launcher
    }

    pub fn launches(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().launches.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.state.lock().unwrap().launches.len()
    }

    /// Instances that ended because their scope was cancelled.
    pub fn stopped_count(&self) -> usize {
        self.state.lock().unwrap().stopped
    }

    /// Make the `index`-th launched instance exit on its own.
    pub fn exit(&self, index: usize, outcome: ExitOutcome) {
        let sender = self
            .state
            .lock()
            .unwrap()
            .exits
            .get_mut(index)
            .and_then(Option::take);
        if let Some(tx) = sender {
            let _ = tx.send(outcome);
        }
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, argv: Vec<String>, scope: CancellationToken) -> LaunchFuture {
        let (tx, rx) = oneshot::channel();
        let immediate = {
            let mut guard = self.state.lock().unwrap();
            guard.launches.push(argv);
            guard.exits.push(Some(tx));
            guard.immediate
        };
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            if let Some(outcome) = immediate {
                return Ok(outcome);
            }

            tokio::select! {
                res = rx => {
                    if let Ok(outcome) = res {
                        return Ok(outcome);
                    }
                    scope.cancelled().await;
                }
                _ = scope.cancelled() => {}
            }

            state.lock().unwrap().stopped += 1;
            Ok(ExitOutcome::Cancelled)
        })
    }
}
