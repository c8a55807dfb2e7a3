// src/config/version.rs

//! Version discovery from the surrounding git checkout.

use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::model::UNKNOWN_VERSION;

/// Run `git describe` in the current directory and return the trimmed tag
/// without a leading `v`.
///
/// Any failure (no git, not a repository, no tags, cancellation) yields
/// [`UNKNOWN_VERSION`].
pub async fn discover_version(cancel: &CancellationToken) -> String {
    let mut cmd = Command::new("git");
    cmd.arg("describe")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::select! {
        out = cmd.output() => out,
        _ = cancel.cancelled() => {
            debug!("version discovery cancelled");
            return UNKNOWN_VERSION.to_string();
        }
    };

    match output {
        Ok(out) if out.status.success() => {
            let version = version_from_describe(&String::from_utf8_lossy(&out.stdout));
            debug!(%version, "discovered version from git describe");
            version
        }
        Ok(out) => {
            debug!(status = ?out.status, "git describe failed");
            UNKNOWN_VERSION.to_string()
        }
        Err(e) => {
            debug!(error = %e, "could not run git describe");
            UNKNOWN_VERSION.to_string()
        }
    }
}

/// Normalise `git describe` output into a version string.
pub fn version_from_describe(raw: &str) -> String {
    let version = raw.trim().trim_start_matches('v');
    if version.is_empty() {
        UNKNOWN_VERSION.to_string()
    } else {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whitespace_and_leading_v() {
        assert_eq!(version_from_describe("v1.4.2-3-gdeadbee\n"), "1.4.2-3-gdeadbee");
        assert_eq!(version_from_describe("2.0.0"), "2.0.0");
    }

    #[test]
    fn empty_output_is_unknown() {
        assert_eq!(version_from_describe("  \n"), UNKNOWN_VERSION);
        assert_eq!(version_from_describe("v"), UNKNOWN_VERSION);
    }
}
