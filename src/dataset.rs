// 🗄️ Dataset - full pipeline assembly + load caching
// parse → clean → enrich once per source file, query the result many times

use crate::cleaner::{self, CleanStats};
use crate::enrich::{self, SalesRecord};
use crate::loader;
use crate::metrics::{self, FilterSpec, QueryResult};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use thiserror::Error;

// ============================================================================
// LOAD ERRORS
// ============================================================================

/// Fatal load failure. Row-level problems never surface here, they are
/// excluded during cleaning; this fires only when no dataset can exist at all.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Covers a missing file as well as bytes no candidate encoding decodes
    #[error("unreadable sales export {path}: {reason}")]
    UnreadableInput { path: PathBuf, reason: String },
}

impl LoadError {
    fn unreadable(path: &Path, reason: impl ToString) -> Self {
        LoadError::UnreadableInput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// SOURCE IDENTITY
// ============================================================================

/// Identity of the bytes a dataset was built from.
///
/// Metadata (mtime + size) is the cheap staleness check; the digest catches
/// touch-without-change so an unchanged file is never recleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub size: u64,
    /// SHA-256 of the raw export bytes, hex-encoded
    pub digest: String,
}

impl SourceStamp {
    fn capture(path: &Path, bytes: &[u8]) -> Self {
        let metadata = fs::metadata(path).ok();
        SourceStamp {
            path: path.to_path_buf(),
            modified: metadata.as_ref().and_then(|m| m.modified().ok()),
            size: metadata.map(|m| m.len()).unwrap_or(bytes.len() as u64),
            digest: digest_hex(bytes),
        }
    }

    /// Compare against the file's current metadata only (no read).
    fn metadata_matches(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(metadata) => {
                self.path == path
                    && self.size == metadata.len()
                    && self.modified == metadata.modified().ok()
            }
            Err(_) => false,
        }
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// DATASET
// ============================================================================

/// The cleaned, enriched, immutable base table.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<SalesRecord>,
    pub stamp: SourceStamp,
    pub clean_stats: CleanStats,
}

impl Dataset {
    /// Run a filtered metrics query over the base table.
    pub fn query(&self, filter: &FilterSpec) -> QueryResult {
        metrics::query(&self.records, filter)
    }

    /// First and last transaction dates, None for an empty dataset.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Whether the source file changed since this dataset was built.
    pub fn is_stale(&self) -> bool {
        !self.stamp.metadata_matches(&self.stamp.path)
    }
}

fn build_dataset(path: &Path, bytes: Vec<u8>) -> Result<Dataset, LoadError> {
    let stamp = SourceStamp::capture(path, &bytes);

    let raw = loader::parse_bytes(&bytes).map_err(|e| LoadError::unreadable(path, format!("{e:#}")))?;
    let (clean, clean_stats) = cleaner::clean(&raw.rows);
    let records = enrich::enrich(clean);

    tracing::info!(
        path = %path.display(),
        encoding = raw.encoding.label(),
        rows = records.len(),
        dropped = clean_stats.dropped() + raw.skipped_rows,
        "dataset loaded"
    );
    if records.is_empty() {
        tracing::warn!(path = %path.display(), "every row was dropped; dataset is empty");
    }

    Ok(Dataset {
        records,
        stamp,
        clean_stats,
    })
}

/// Load and build the dataset from a sales export.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::unreadable(path, e))?;
    build_dataset(path, bytes)
}

// ============================================================================
// LOAD CACHE
// ============================================================================

/// Memoizes dataset construction per source file.
///
/// Reparsing and recleaning on every interactive query is wasted work for a
/// file that changes only on each export, so the cache hands out the shared
/// immutable dataset until the file's identity changes.
pub struct DatasetCache {
    slot: Mutex<Option<Arc<Dataset>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        DatasetCache {
            slot: Mutex::new(None),
        }
    }

    /// Return the cached dataset for `path`, rebuilding when the file's
    /// identity no longer matches the cached stamp.
    pub fn load(&self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(dataset) = slot.as_ref() {
            if dataset.stamp.path == path && dataset.stamp.metadata_matches(path) {
                tracing::debug!(path = %path.display(), "dataset cache hit");
                return Ok(Arc::clone(dataset));
            }
        }

        // Metadata moved: read the bytes, and skip the rebuild when the
        // content itself turns out unchanged (touch without edit)
        let bytes = fs::read(path).map_err(|e| LoadError::unreadable(path, e))?;
        if let Some(dataset) = slot.as_ref() {
            if dataset.stamp.path == path && dataset.stamp.digest == digest_hex(&bytes) {
                tracing::debug!(path = %path.display(), "source bytes unchanged; reusing dataset");
                return Ok(Arc::clone(dataset));
            }
        }

        let dataset = Arc::new(build_dataset(path, bytes)?);
        *slot = Some(Arc::clone(&dataset));
        Ok(dataset)
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
