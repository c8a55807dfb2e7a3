// tests/lifecycle.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use watchbuild::exec::{restart_channel, ExitOutcome, ProcessLifecycle};
use watchbuild::WatchbuildError;
use watchbuild_test_utils::{init_tracing, wait_until, with_timeout, FakeLauncher};

fn argv() -> Vec<String> {
    vec!["bin/app".to_string(), "serve".to_string()]
}

#[tokio::test]
async fn restart_stops_the_old_instance_before_starting_a_new_one() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let (tx, rx) = restart_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, true));

    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;

    assert!(tx.signal());
    wait_until(|| observed.launch_count() == 2).await;
    assert_eq!(launcher.stopped_count(), 1);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(launcher.stopped_count(), 2);
    assert!(launcher.launches().iter().all(|a| *a == argv()));
}

#[tokio::test]
async fn deferred_start_waits_for_the_first_signal() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let (tx, rx) = restart_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, false));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(launcher.launch_count(), 0);

    tx.signal();
    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;
    assert_eq!(launcher.stopped_count(), 0);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn signals_are_coalesced_while_one_is_pending() {
    let (tx, mut rx) = restart_channel();

    assert!(tx.signal());
    assert!(tx.signal());
    assert!(tx.signal());

    assert_eq!(rx.recv().await, Some(()));
    assert!(rx.try_recv().is_err());

    drop(rx);
    assert!(!tx.signal(), "closed channel reports failure");
}

#[tokio::test]
async fn crash_of_the_last_instance_is_reported() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let (tx, rx) = restart_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, true));

    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;
    launcher.exit(0, ExitOutcome::Failed(2));

    // No more builds are coming.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    drop(tx);

    let err = with_timeout(handle)
        .await
        .unwrap()
        .expect_err("crash is fatal");
    match err {
        WatchbuildError::ProcessFailed { executable, outcome } => {
            assert_eq!(executable, "bin/app");
            assert_eq!(outcome, ExitOutcome::Failed(2));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn crash_followed_by_restart_is_forgotten() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let (tx, rx) = restart_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, true));

    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;
    launcher.exit(0, ExitOutcome::Failed(1));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    tx.signal();
    wait_until(|| observed.launch_count() == 2).await;
    assert_eq!(launcher.stopped_count(), 0, "crashed instance was not stopped");

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(launcher.stopped_count(), 1);
}

#[tokio::test]
async fn run_once_treats_cancellation_as_success() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run_once(cancel.clone()));

    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;
    cancel.cancel();

    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(launcher.stopped_count(), 1);
}

#[tokio::test]
async fn signal_death_during_shutdown_is_not_a_failure() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let (_tx, rx) = restart_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, true));

    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;

    // The terminal's SIGINT kills the child just before shutdown starts.
    launcher.exit(0, ExitOutcome::Terminated);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.cancel();

    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn nonzero_exit_before_shutdown_is_still_reported() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let lifecycle = ProcessLifecycle::new(Arc::new(launcher.clone()), argv());
    let (_tx, rx) = restart_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(lifecycle.run(cancel.clone(), rx, true));

    let observed = launcher.clone();
    wait_until(|| observed.launch_count() == 1).await;
    launcher.exit(0, ExitOutcome::Failed(2));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.cancel();

    let err = with_timeout(handle).await.unwrap().expect_err("exit code 2");
    assert!(matches!(
        err,
        WatchbuildError::ProcessFailed {
            outcome: ExitOutcome::Failed(2),
            ..
        }
    ));
}
