// src/watch/mod.rs

//! Source tree change detection.
//!
//! This module is responsible for:
//! - Compiling per-step file filters into glob sets (`patterns`).
//! - Hashing a watched tree into a single digest (`hash`).
//!
//! Change detection is done by polling: the pipeline re-hashes every watch
//! list on each tick and compares digests. It does **not** know about step
//! order or what a change implies for later steps.

pub mod hash;
pub mod patterns;

pub use hash::{TreeHash, TreeHasher, EXCLUDED_DIRS};
pub use patterns::{FileFilter, WatchProfile};
