#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use watchbuild::config::{CompileConfig, RunOptions};
use watchbuild::engine::Pipeline;
use watchbuild::fs::mock::MockFileSystem;
use watchbuild_test_utils::{RecordingBuild, RecordingBuildBuilder};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Three steps (`proto`, `server`, `client`) over `proto/`, `server/` and
/// `client/` in an in-memory tree, one source file each.
pub fn three_step_tree() -> (RecordingBuild, MockFileSystem) {
    let fs = MockFileSystem::new();
    fs.add_file("proto/api.proto", "message Ping {}");
    fs.add_file("server/main.rs", "fn main() {}");
    fs.add_file("client/app.ts", "export {}");

    let build = RecordingBuildBuilder::new("bin/server")
        .dir_step("proto", "proto")
        .dir_step("server", "server")
        .dir_step("client", "client")
        .build();

    (build, fs)
}

pub fn conf(quick: bool) -> CompileConfig {
    CompileConfig {
        quick,
        ..CompileConfig::default()
    }
}

/// Watch options with a short poll interval.
pub fn watch_options(run: bool) -> RunOptions {
    RunOptions {
        watch: true,
        run,
        poll_interval: Duration::from_millis(20),
        ..RunOptions::default()
    }
}

/// A pipeline over `fs` with a watch session already started.
pub fn watching_pipeline(
    recording: &RecordingBuild,
    fs: &MockFileSystem,
    quick: bool,
) -> Pipeline {
    let mut pipeline = Pipeline::new(recording.build.clone(), conf(quick), RunOptions::default())
        .expect("valid build")
        .with_filesystem(Arc::new(fs.clone()));
    pipeline.start_watch(None);
    pipeline
}
