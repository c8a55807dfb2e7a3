// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::BuildArgs;

/// Fallback used when no version can be discovered.
pub const UNKNOWN_VERSION: &str = "unknown-version";

/// Options handed to every compile step.
///
/// Built once per invocation and cloned into each call; steps never see a
/// mutated copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    /// Create a development build.
    pub development: bool,
    /// Quick build (also narrows the rebuild cascade while watching).
    pub quick: bool,
    /// Version of the package, or [`UNKNOWN_VERSION`].
    pub version: String,
    /// Target operating system; empty means the host.
    pub target_os: String,
    /// Target architecture; empty means the host.
    pub target_arch: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            development: false,
            quick: false,
            version: UNKNOWN_VERSION.to_string(),
            target_os: String::new(),
            target_arch: String::new(),
        }
    }
}

impl CompileConfig {
    pub fn from_args(args: &BuildArgs, version: impl Into<String>) -> Self {
        Self {
            development: args.development,
            quick: args.quick,
            version: version.into(),
            target_os: args.target_os.clone(),
            target_arch: args.target_arch.clone(),
        }
    }
}

/// A source tree to watch for changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    /// Files and directories to watch.
    pub paths: Vec<PathBuf>,

    /// Limits the watched files to those matching one of these globs
    /// (e.g. `"*.rs"`). `None` watches every file.
    pub file_filter: Option<Vec<String>>,
}

impl WatchList {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            file_filter: None,
        }
    }

    pub fn with_filter<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_filter = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

/// How a build run behaves once the first pass is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Keep polling the watch lists and rebuild on change.
    pub watch: bool,
    /// Launch the executable after a successful build.
    pub run: bool,
    /// Arguments appended after the executable name.
    pub args: Vec<String>,
    /// Sleep between two polls of the watch lists.
    pub poll_interval: Duration,
}

/// Default sleep between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            watch: false,
            run: false,
            args: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl RunOptions {
    pub fn from_args(args: &BuildArgs) -> Self {
        Self {
            watch: args.watch,
            run: args.run,
            args: args.args.clone(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Settings file for the standalone binary, as read from TOML.
///
/// ```toml
/// [config]
/// executable = "target/debug/server"
/// poll_interval = "250ms"
///
/// [default]
/// filter = ["*.rs"]
///
/// [[step]]
/// name = "server"
/// cmd = "cargo build"
/// paths = ["src"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BuildFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Defaults shared by all steps from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All steps from `[[step]]`, in build order.
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Executable launched by `--run`, relative to the settings file.
    #[serde(default)]
    pub executable: String,

    /// Duration string (e.g. `"250ms"`, `"1s"`).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_poll_interval() -> String {
    "250ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            executable: String::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// File filter for steps that do not declare their own.
    #[serde(default)]
    pub filter: Option<Vec<String>>,
}

/// One `[[step]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// Name used in log lines.
    pub name: String,

    /// Shell command that performs the compilation.
    pub cmd: String,

    /// Watched files and directories, relative to the settings file.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Optional step-local file filter; falls back to `default.filter`.
    #[serde(default)]
    pub filter: Option<Vec<String>>,
}

impl StepConfig {
    /// Effective filter given the `[default]` section.
    pub fn effective_filter<'a>(&'a self, defaults: &'a DefaultSection) -> Option<&'a Vec<String>> {
        self.filter.as_ref().or(defaults.filter.as_ref())
    }
}

impl BuildFile {
    /// Parsed `poll_interval`.
    pub fn poll_interval(&self) -> Result<Duration, String> {
        parse_duration(&self.config.poll_interval)
    }
}

/// Parse durations like `"250ms"`, `"3s"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
