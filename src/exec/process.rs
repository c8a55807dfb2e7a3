// src/exec/process.rs

//! Child processes that share the parent's standard streams.

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ExitOutcome;

/// Spawn `cmd` with inherited stdin/stdout/stderr and wait for it.
///
/// If `scope` is cancelled first, the child is killed and the outcome is
/// [`ExitOutcome::Cancelled`].
pub async fn run_inherited(mut cmd: Command, scope: &CancellationToken) -> Result<ExitOutcome> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let program = format!("{:?}", cmd.as_std().get_program());
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process {program}"))?;

    debug!(program = %program, pid = ?child.id(), "process started");

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process {program}"))?;
            let outcome = ExitOutcome::from_status(status);
            debug!(program = %program, %outcome, "process exited");
            Ok(outcome)
        }

        _ = scope.cancelled() => {
            info!(program = %program, "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(program = %program, error = %e, "failed to kill child process on cancellation");
            }
            Ok(ExitOutcome::Cancelled)
        }
    }
}

/// Run `argv[0]` with the remaining arguments, inheriting the parent's
/// standard streams, and fail unless it exits successfully.
pub async fn passthru<S: AsRef<str>>(scope: &CancellationToken, argv: &[S]) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("passthru requires a program name"))?;

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args.iter().map(|a| a.as_ref()));

    let outcome = run_inherited(cmd, scope).await?;
    if outcome.is_success() {
        Ok(())
    } else {
        Err(anyhow!("{} {}", program.as_ref(), outcome))
    }
}

/// Shell command for the current platform (`sh -c` / `cmd /C`).
pub fn shell_command(script: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    }
}
