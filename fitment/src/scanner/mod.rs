//! Finds the catalog files of a source directory
//!
//! Files are returned in relative-path order so that products are imported,
//! and ties in ranking broken, in a stable catalog order.

use crate::error::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A catalog file found under a source root
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to the source root, with `/` separators
    pub relative_path: String,
    /// File size in bytes
    pub size: u64,
}

/// Walks a source root for catalog files
pub struct Scanner {
    root: PathBuf,
    patterns: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Scanner {
    /// Create a scanner for a source root
    ///
    /// With no include patterns every file is a candidate; the catalog parser
    /// rejects formats it does not know.
    pub fn new<P: AsRef<Path>>(root: P, patterns: &[&str], exclude: &[&str]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let exclude = exclude
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Scanner {
            root,
            patterns,
            exclude,
        })
    }

    /// Catalog files under the root, sorted by relative path
    ///
    /// Unreadable entries are logged and skipped.
    pub fn scan(&self) -> Vec<ScanResult> {
        let mut results: Vec<ScanResult> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable catalog entry under {}: {}", self.root.display(), e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .filter_map(|e| {
                let metadata = e.metadata().ok()?;
                let relative_path = e
                    .path()
                    .strip_prefix(&self.root)
                    .ok()?
                    .to_string_lossy()
                    .replace('\\', "/");

                Some(ScanResult {
                    path: e.path().to_path_buf(),
                    relative_path,
                    size: metadata.len(),
                })
            })
            .collect();

        results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        results
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }

    /// Whether a file is a catalog file for this source
    fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let relative = self.relative(path);
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        let options = glob::MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        self.patterns.iter().any(|p| {
            // "**/*.json" also covers catalogs at the root
            if let Some(suffix) = p.as_str().strip_prefix("**/") {
                if let Ok(suffix_pattern) = Pattern::new(suffix) {
                    if suffix_pattern.matches_with(filename, options) {
                        return true;
                    }
                }
            }

            p.matches_with(&relative, options) || p.matches_with(filename, options)
        })
    }

    /// Whether a path is outside the catalog
    fn is_excluded(&self, path: &Path) -> bool {
        if path == self.root {
            return false;
        }

        // Hidden entries hold drafts and editor state
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with('.') {
            return true;
        }

        let relative = self.relative(path);
        self.exclude.iter().any(|p| p.matches(&relative))
    }
}
