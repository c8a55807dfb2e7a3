// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::WatchList;

/// Compiled file filter of a watch list.
///
/// Patterns are shell-style: `*` does not cross a path separator. A file is
/// selected when either its full path or its base name matches, so `"*.rs"`
/// selects Rust files at any depth while `"src/*.rs"` only selects files
/// directly under `src`.
#[derive(Clone)]
pub struct FileFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFilter")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl FileFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let pat = pat.as_ref();
            let glob = GlobBuilder::new(pat)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern: {pat}"))?;
            builder.add(glob);
        }

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set: builder.build()?,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether the file at `path` passes the filter.
    pub fn matches(&self, path: &Path) -> bool {
        let full = path.to_string_lossy().replace('\\', "/");
        if self.set.is_match(full.as_str()) {
            return true;
        }
        match path.file_name() {
            Some(base) => self.set.is_match(Path::new(base)),
            None => false,
        }
    }
}

/// Compiled form of a [`WatchList`]: what the tree hasher observes for one
/// step.
#[derive(Debug, Clone)]
pub struct WatchProfile {
    paths: Vec<PathBuf>,
    filter: Option<FileFilter>,
}

impl WatchProfile {
    pub fn compile(list: &WatchList) -> Result<Self> {
        let filter = match &list.file_filter {
            Some(patterns) => Some(FileFilter::new(patterns)?),
            None => None,
        };

        Ok(Self {
            paths: list.paths.clone(),
            filter,
        })
    }

    /// Root paths, in declaration order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn filter(&self) -> Option<&FileFilter> {
        self.filter.as_ref()
    }

    /// Whether a file contributes its content to the digest.
    pub fn includes_file(&self, path: &Path) -> bool {
        match &self.filter {
            Some(filter) => filter.matches(path),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_pattern_matches_at_any_depth() {
        let filter = FileFilter::new(&["*.go"]).unwrap();
        assert!(filter.matches(Path::new("main.go")));
        assert!(filter.matches(Path::new("cmd/server/main.go")));
        assert!(!filter.matches(Path::new("cmd/server/main.txt")));
    }

    #[test]
    fn path_pattern_does_not_cross_separators() {
        let filter = FileFilter::new(&["src/*.rs"]).unwrap();
        assert!(filter.matches(Path::new("src/lib.rs")));
        assert!(!filter.matches(Path::new("src/watch/hash.rs")));
    }

    #[test]
    fn any_pattern_is_enough() {
        let filter = FileFilter::new(&["*.ts", "*.css"]).unwrap();
        assert!(filter.matches(Path::new("web/app.css")));
        assert!(filter.matches(Path::new("web/app.ts")));
        assert!(!filter.matches(Path::new("web/app.html")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(FileFilter::new(&["src/[abc"]).is_err());
    }

    #[test]
    fn profile_without_filter_includes_everything() {
        let profile = WatchProfile::compile(&WatchList::new(["src"])).unwrap();
        assert!(profile.includes_file(Path::new("src/anything.bin")));

        let profile =
            WatchProfile::compile(&WatchList::new(["src"]).with_filter(["*.rs"])).unwrap();
        assert!(profile.includes_file(Path::new("src/a.rs")));
        assert!(!profile.includes_file(Path::new("src/a.md")));
    }
}
