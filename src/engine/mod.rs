// src/engine/mod.rs

//! Incremental rebuild engine.
//!
//! - [`build`]: the caller's description of a build (executable + ordered
//!   steps, each a watch list and a compile job).
//! - [`status`]: the pure per-step dirty/broken state machine.
//! - [`pipeline`]: the async shell that runs the first pass, the poll loop,
//!   and hands restarts to the process coordinator.

pub mod build;
pub mod pipeline;
pub mod status;

pub use build::{Build, BuildStep, CompileFuture, CompileJob};
pub use pipeline::{FirstPass, Pipeline, TickReport};
pub use status::{StatusBoard, StepState, StepStatus};
