// src/exec/shell.rs

//! Compile step that runs a shell command.
//!
//! Used by the standalone binary, where steps come from the settings file
//! rather than from Rust closures.

use std::path::PathBuf;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::CompileConfig;
use crate::engine::{CompileFuture, CompileJob};

use super::process::{run_inherited, shell_command};

/// Runs `cmd` through the platform shell with the compile options exported
/// as `WATCHBUILD_*` environment variables.
#[derive(Debug, Clone)]
pub struct ShellJob {
    name: String,
    cmd: String,
    workdir: Option<PathBuf>,
}

impl ShellJob {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            workdir: None,
        }
    }

    /// Run the command from `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }
}

/// Environment handed to shell steps.
pub fn compile_env(conf: &CompileConfig) -> Vec<(&'static str, String)> {
    vec![
        ("WATCHBUILD_DEVELOPMENT", conf.development.to_string()),
        ("WATCHBUILD_QUICK", conf.quick.to_string()),
        ("WATCHBUILD_VERSION", conf.version.clone()),
        ("WATCHBUILD_TARGET_OS", conf.target_os.clone()),
        ("WATCHBUILD_TARGET_ARCH", conf.target_arch.clone()),
    ]
}

impl CompileJob for ShellJob {
    fn compile(&self, cancel: CancellationToken, conf: CompileConfig) -> CompileFuture<'_> {
        Box::pin(async move {
            info!(step = %self.name, cmd = %self.cmd, "running build command");

            let mut cmd = shell_command(&self.cmd);
            cmd.envs(compile_env(&conf));
            if let Some(dir) = &self.workdir {
                cmd.current_dir(dir);
            }

            let outcome = run_inherited(cmd, &cancel).await?;
            if outcome.is_success() {
                Ok(())
            } else {
                Err(anyhow!("`{}` {}", self.cmd, outcome))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_exports_every_option() {
        let conf = CompileConfig {
            development: true,
            quick: false,
            version: "1.0.0".into(),
            target_os: "linux".into(),
            target_arch: "amd64".into(),
        };
        let env = compile_env(&conf);
        assert!(env.contains(&("WATCHBUILD_DEVELOPMENT", "true".to_string())));
        assert!(env.contains(&("WATCHBUILD_QUICK", "false".to_string())));
        assert!(env.contains(&("WATCHBUILD_VERSION", "1.0.0".to_string())));
        assert!(env.contains(&("WATCHBUILD_TARGET_OS", "linux".to_string())));
        assert!(env.contains(&("WATCHBUILD_TARGET_ARCH", "amd64".to_string())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_an_error() {
        let ok = ShellJob::new("ok", "test \"$WATCHBUILD_VERSION\" = 2.1");
        let conf = CompileConfig {
            version: "2.1".into(),
            ..CompileConfig::default()
        };
        assert!(ok.compile(CancellationToken::new(), conf.clone()).await.is_ok());

        let bad = ShellJob::new("bad", "exit 3");
        let err = bad.compile(CancellationToken::new(), conf).await.unwrap_err();
        assert!(err.to_string().contains("exit code 3"), "{err}");
    }
}
