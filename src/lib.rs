// src/lib.rs

//! Embeddable build orchestrator.
//!
//! A program describes its build as an executable name plus an ordered list
//! of [`BuildStep`]s, each pairing a watched source tree with a compile job,
//! and hands it to [`main`] (or [`run`] from async code). The orchestrator
//! compiles every step, optionally polls the trees and recompiles what
//! changed, and optionally runs and restarts the executable.
//!
//! ```no_run
//! use watchbuild::{Build, BuildStep, WatchList};
//!
//! fn main() {
//!     let build = Build::new("target/debug/server").step(BuildStep::from_fn(
//!         "server",
//!         WatchList::new(["src"]).with_filter(["*.rs"]),
//!         |cancel, _conf| async move {
//!             watchbuild::exec::passthru(&cancel, &["cargo", "build"]).await
//!         },
//!     ));
//!     watchbuild::main(build);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{BuildArgs, CliArgs};
use crate::config::{discover_version, load_and_validate, settings_root_dir, BuildFile};
use crate::exec::ShellJob;

pub use crate::config::{CompileConfig, RunOptions, WatchList};
pub use crate::engine::{Build, BuildStep, CompileJob, Pipeline};
pub use crate::errors::{Result, WatchbuildError};

/// Parse the command line, set up logging, and run `build` to completion.
///
/// Exits the process with status 1 on a fatal error.
pub fn main(build: Build) {
    let args = <BuildArgs as clap::Parser>::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("watchbuild: {err:#}");
    }

    let result = tokio::runtime::Runtime::new()
        .map_err(WatchbuildError::from)
        .and_then(|rt| rt.block_on(run(args, build)));

    if let Err(err) = result {
        eprintln!("watchbuild error: {err}");
        std::process::exit(1);
    }
}

/// High-level async entry point.
///
/// This wires together:
/// - version discovery and the [`CompileConfig`]
/// - the [`Pipeline`] (first pass, poll loop, process coordinator)
/// - Ctrl-C handling (cancels everything)
pub async fn run(args: BuildArgs, build: Build) -> Result<()> {
    let options = RunOptions::from_args(&args);
    run_with_options(args, build, options).await
}

async fn run_with_options(args: BuildArgs, build: Build, options: RunOptions) -> Result<()> {
    let cancel = CancellationToken::new();

    // Ctrl-C → graceful shutdown.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; shutting down");
            cancel.cancel();
        });
    }

    let version = discover_version(&cancel).await;
    let conf = CompileConfig::from_args(&args, version);
    debug!(?conf, ?options, "resolved build configuration");

    let mut pipeline = Pipeline::new(build, conf, options)?;
    pipeline.run(cancel).await
}

/// Entry point of the standalone `watchbuild` binary: steps are shell
/// commands declared in a settings file.
pub async fn run_cli(args: CliArgs) -> Result<()> {
    let settings_path = Path::new(&args.config);
    let file = load_and_validate(settings_path)?;

    if args.dry_run {
        print_dry_run(&file);
        return Ok(());
    }

    let root = settings_root_dir(settings_path);
    let build = build_from_file(&file, &root)?;

    let mut options = RunOptions::from_args(&args.build);
    options.poll_interval = file
        .poll_interval()
        .map_err(WatchbuildError::ConfigError)?;

    run_with_options(args.build, build, options).await
}

/// Turn a validated settings file into a [`Build`] of [`ShellJob`] steps.
///
/// Relative paths (watched paths and the executable) are resolved against
/// `root`; commands run from `root`.
pub fn build_from_file(file: &BuildFile, root: &Path) -> Result<Build> {
    let executable = if file.config.executable.is_empty() {
        String::new()
    } else {
        root.join(&file.config.executable)
            .to_string_lossy()
            .into_owned()
    };

    let mut build = Build::new(executable);
    for step in &file.steps {
        let mut watch = WatchList::new(step.paths.iter().map(|p| root.join(p)));
        if let Some(filter) = step.effective_filter(&file.default) {
            watch = watch.with_filter(filter.iter().cloned());
        }
        let job = ShellJob::new(step.name.clone(), step.cmd.clone()).in_dir(root);
        build = build.step(BuildStep::new(step.name.clone(), watch, job));
    }

    Ok(build)
}

/// Simple dry-run output: print settings and steps.
fn print_dry_run(file: &BuildFile) {
    println!("watchbuild dry-run");
    println!("  config.executable = {:?}", file.config.executable);
    println!("  config.poll_interval = {}", file.config.poll_interval);
    println!();

    println!("steps ({}):", file.steps.len());
    for (index, step) in file.steps.iter().enumerate() {
        println!("  {index}. {}", step.name);
        println!("      cmd: {}", step.cmd);
        println!("      paths: {:?}", step.paths);
        if let Some(filter) = step.effective_filter(&file.default) {
            println!("      filter: {:?}", filter);
        }
    }

    debug!("dry-run complete (no execution)");
}
