// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! [`BuildArgs`] is the surface shared by every program that embeds the
//! orchestrator (see [`crate::main`]). The standalone `watchbuild` binary
//! flattens it into [`CliArgs`] and adds the settings-file flags.

use clap::{Parser, ValueEnum};

/// Flags understood by every build program.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    version,
    about = "Compile, watch and run a project.",
    long_about = None
)]
pub struct BuildArgs {
    /// Create a development build.
    #[arg(long)]
    pub development: bool,

    /// Quick build: a change in one step does not invalidate later steps.
    #[arg(long)]
    pub quick: bool,

    /// Cross-compile for this operating system.
    #[arg(long, alias = "goos", value_name = "OS", default_value = "")]
    pub target_os: String,

    /// Cross-compile for this architecture.
    #[arg(long, alias = "goarch", value_name = "ARCH", default_value = "")]
    pub target_arch: String,

    /// Watch source trees for changes and recompile.
    #[arg(long)]
    pub watch: bool,

    /// Run the executable upon successful compilation.
    #[arg(long)]
    pub run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Arguments forwarded verbatim to the executable.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Command-line arguments for the standalone `watchbuild` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchbuild",
    version,
    about = "Run build steps from a settings file, rebuilding on source changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Watchbuild.toml")]
    pub config: String,

    /// Parse + validate, print the steps, but don't compile anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub build: BuildArgs,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_arguments_are_forwarded_verbatim() {
        let args = BuildArgs::parse_from([
            "build", "--watch", "--run", "--quick", "serve", "--port", "8080",
        ]);
        assert!(args.watch);
        assert!(args.run);
        assert!(args.quick);
        assert!(!args.development);
        assert_eq!(args.args, vec!["serve", "--port", "8080"]);
    }

    #[test]
    fn target_flags_accept_aliases() {
        let args = BuildArgs::parse_from(["build", "--goos", "linux", "--target-arch", "arm64"]);
        assert_eq!(args.target_os, "linux");
        assert_eq!(args.target_arch, "arm64");
    }

    #[test]
    fn binary_flags_flatten_build_flags() {
        let args = CliArgs::parse_from(["watchbuild", "--config", "x.toml", "--development"]);
        assert_eq!(args.config, "x.toml");
        assert!(args.build.development);
        assert!(!args.dry_run);
    }
}
