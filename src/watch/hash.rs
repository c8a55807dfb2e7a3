// src/watch/hash.rs

//! Content digest of a watched source tree.
//!
//! The digest is a BLAKE3 hash over a recursive walk of every root path of a
//! [`WatchProfile`]. Callers only compare digests for equality; no diff
//! information is kept.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use blake3::Hasher;
use tracing::{debug, trace};

use crate::fs::{EntryKind, FileSystem, RealFileSystem};
use crate::watch::patterns::WatchProfile;

/// Directory names skipped below the top level of a watched root.
pub const EXCLUDED_DIRS: &[&str] = &[".git", "..", "node_modules", "build", "doc"];

/// Digest of a watched tree, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreeHash(String);

impl TreeHash {
    /// Wrap an already computed hex digest.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes [`TreeHash`]es through a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct TreeHasher {
    fs: Arc<dyn FileSystem>,
}

impl Default for TreeHasher {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl TreeHasher {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Hash every root of `profile`, in declaration order.
    ///
    /// Never fails: paths that cannot be read contribute a stand-in digest.
    pub fn hash(&self, profile: &WatchProfile) -> TreeHash {
        let mut hasher = Hasher::new();
        for root in profile.paths() {
            if let Some(node) = self.node_digest(0, root, profile) {
                hasher.update(node.as_bytes());
            }
        }

        let hash = TreeHash(hasher.finalize().to_hex().to_string());
        debug!(hash = %hash, roots = profile.paths().len(), "computed tree hash");
        hash
    }

    /// Digest of one node; `None` when the node contributes nothing.
    fn node_digest(&self, depth: usize, path: &Path, profile: &WatchProfile) -> Option<blake3::Hash> {
        let mut hasher = Hasher::new();
        mix_path(&mut hasher, path);

        let kind = match self.fs.stat(path) {
            Ok(kind) => kind,
            Err(e) => {
                trace!(path = ?path, error = %e, "unreadable path; hashing name only");
                return Some(hasher.finalize());
            }
        };

        match kind {
            EntryKind::Dir => {
                if depth > 0 && is_excluded_dir(path) {
                    trace!(path = ?path, "skipping excluded directory");
                    return None;
                }

                match self.fs.read_dir(path) {
                    Ok(mut children) => {
                        children.sort();
                        for child in children.iter().filter(|c| !is_hidden(c)) {
                            if let Some(node) = self.node_digest(depth + 1, child, profile) {
                                hasher.update(node.as_bytes());
                            }
                        }
                    }
                    Err(e) => {
                        trace!(path = ?path, error = %e, "unlistable directory; hashing name only");
                    }
                }
            }
            EntryKind::File => {
                if !profile.includes_file(path) {
                    return None;
                }

                if let Err(e) = self.hash_file_content(path, &mut hasher) {
                    trace!(path = ?path, error = %e, "unreadable file; hashing name only");
                }
            }
        }

        Some(hasher.finalize())
    }

    fn hash_file_content(&self, path: &Path, hasher: &mut Hasher) -> anyhow::Result<()> {
        let mut reader = self.fs.open_read(path)?;
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(())
    }
}

/// Length-prefixed so a name can never run into the content after it.
fn mix_path(hasher: &mut Hasher, path: &Path) {
    let name = path.to_string_lossy();
    hasher.update(&(name.len() as u64).to_le_bytes());
    hasher.update(name.as_bytes());
}

fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn is_hidden(path: &Path) -> bool {
    base_name(path).map_or(false, |n| n.is_empty() || n.starts_with('.'))
}

fn is_excluded_dir(path: &Path) -> bool {
    // `file_name` is `None` for a trailing `..`.
    match base_name(path) {
        Some(name) => EXCLUDED_DIRS.contains(&name),
        None => path.ends_with(".."),
    }
}
