//! Catalog importer
//!
//! Walks a source directory, parses changed catalog files and replaces their
//! products in the store. Unchanged files are recognised by content hash and
//! skipped; files that disappeared lose their products.

use crate::catalog::parse_catalog;
use crate::error::{Error, Result};
use crate::scanner::{ScanResult, Scanner};
use crate::store::Store;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

/// Statistics from an import
#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    /// Number of files scanned
    pub files_scanned: usize,
    /// Number of files imported (new or changed)
    pub files_imported: usize,
    /// Number of files skipped (unchanged)
    pub files_skipped: usize,
    /// Number of files removed (gone from the source directory)
    pub files_removed: usize,
    /// Number of products written
    pub products_imported: usize,
    /// Number of files that failed to import
    pub errors: usize,
    /// Time taken
    pub duration: Duration,
}

impl ImportStats {
    fn absorb(&mut self, other: &ImportStats) {
        self.files_scanned += other.files_scanned;
        self.files_imported += other.files_imported;
        self.files_skipped += other.files_skipped;
        self.files_removed += other.files_removed;
        self.products_imported += other.products_imported;
        self.errors += other.errors;
    }
}

/// Progress callback for imports
pub trait ImportProgress {
    /// Called when a file is processed
    fn on_file(&mut self, path: &Path, status: FileStatus);
    /// Called when the import is complete
    fn on_complete(&mut self, stats: &ImportStats);
}

/// Status of a file during import
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// File was imported with this many products
    Imported(usize),
    /// File was skipped (unchanged)
    Skipped,
    /// File was removed
    Removed,
    /// Error processing file
    Error(String),
}

/// Catalog importer
pub struct Importer<'a> {
    store: &'a Store,
}

impl<'a> Importer<'a> {
    /// Create a new importer
    pub fn new(store: &'a Store) -> Self {
        Importer { store }
    }

    /// Import a source
    pub fn import_source(&self, name: &str) -> Result<ImportStats> {
        self.import_source_with_progress(name, &mut NoopProgress)
    }

    /// Import a source with progress reporting
    pub fn import_source_with_progress(
        &self,
        name: &str,
        progress: &mut dyn ImportProgress,
    ) -> Result<ImportStats> {
        let start = Instant::now();
        let mut stats = ImportStats::default();

        let source = self.store.get_source(name)?;
        if !Path::new(&source.path).is_dir() {
            // An unmounted or moved directory must not wipe the source's products
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source directory not found: {}", source.path),
            )));
        }

        let patterns: Vec<&str> = source.patterns.iter().map(|s| s.as_str()).collect();
        let exclude: Vec<&str> = source.exclude.iter().map(|s| s.as_str()).collect();
        let scanner = Scanner::new(&source.path, &patterns, &exclude)?;

        let mut seen_paths = HashSet::new();
        let mut deferred = Vec::new();

        for scan_result in scanner.scan() {
            stats.files_scanned += 1;
            seen_paths.insert(scan_result.relative_path.clone());

            match self.import_file(name, &scan_result.path, &scan_result.relative_path) {
                // The owning file may drop the id later in this pass
                Err(Error::DuplicateProduct { .. }) => deferred.push(scan_result),
                outcome => record_outcome(outcome, &scan_result, &mut stats, progress),
            }
        }

        for file in self.store.list_files(name)? {
            if !seen_paths.contains(&file.path) {
                self.store.remove_file(name, &file.path)?;
                stats.files_removed += 1;
                progress.on_file(Path::new(&file.path), FileStatus::Removed);
            }
        }

        for scan_result in deferred {
            let outcome = self.import_file(name, &scan_result.path, &scan_result.relative_path);
            record_outcome(outcome, &scan_result, &mut stats, progress);
        }

        stats.duration = start.elapsed();
        tracing::info!(
            "Imported source {}: {} files imported, {} skipped, {} removed, {} errors",
            name,
            stats.files_imported,
            stats.files_skipped,
            stats.files_removed,
            stats.errors
        );
        progress.on_complete(&stats);

        Ok(stats)
    }

    /// Import all sources
    pub fn import_all(&self) -> Result<ImportStats> {
        let mut total_stats = ImportStats::default();
        let start = Instant::now();

        for source in self.store.list_sources()? {
            let stats = self.import_source(&source.name)?;
            total_stats.absorb(&stats);
        }

        total_stats.duration = start.elapsed();
        Ok(total_stats)
    }

    /// Import a single file
    ///
    /// Returns the number of products imported, or `None` if unchanged
    fn import_file(&self, source: &str, path: &Path, relative_path: &str) -> Result<Option<usize>> {
        let content = std::fs::read(path)?;
        let hash = calculate_hash(&content);

        if self.store.file_hash(source, relative_path)?.as_deref() == Some(hash.as_str()) {
            return Ok(None);
        }

        let products = parse_catalog(path, &content)?;
        self.store
            .replace_file_products(source, relative_path, &hash, &products)?;

        Ok(Some(products.len()))
    }
}

/// Count an import outcome and report it to the progress callback
fn record_outcome(
    outcome: Result<Option<usize>>,
    scan_result: &ScanResult,
    stats: &mut ImportStats,
    progress: &mut dyn ImportProgress,
) {
    match outcome {
        Ok(Some(count)) => {
            stats.files_imported += 1;
            stats.products_imported += count;
            tracing::debug!("Imported {} ({} products)", scan_result.relative_path, count);
            progress.on_file(&scan_result.path, FileStatus::Imported(count));
        }
        Ok(None) => {
            stats.files_skipped += 1;
            tracing::debug!("Unchanged {}", scan_result.relative_path);
            progress.on_file(&scan_result.path, FileStatus::Skipped);
        }
        Err(e) => {
            stats.errors += 1;
            tracing::warn!("Error importing {}: {}", scan_result.relative_path, e);
            progress.on_file(&scan_result.path, FileStatus::Error(e.to_string()));
        }
    }
}

/// Calculate SHA-256 hash of content
fn calculate_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// No-op progress reporter
struct NoopProgress;

impl ImportProgress for NoopProgress {
    fn on_file(&mut self, _path: &Path, _status: FileStatus) {}
    fn on_complete(&mut self, _stats: &ImportStats) {}
}
