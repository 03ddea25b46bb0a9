//! CSV snapshot loading and the memoizing snapshot cache.
//!
//! A snapshot is one header-bearing, comma-delimited, UTF-8 file. Cleaned
//! snapshots are written whole and never mutated in place; downstream
//! consumers re-read them through [`SnapshotCache`], which memoizes by path
//! and only reloads when the file's mtime changes.

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// One parsed CSV file: header plus string records, columns untouched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    header: StringRecord,
    records: Vec<StringRecord>,
}

impl Snapshot {
    pub fn new(header: StringRecord, records: Vec<StringRecord>) -> Self {
        Self { header, records }
    }

    /// Read a snapshot from disk. An unreadable file is fatal for the run.
    pub fn read(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let header = rdr
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .clone();
        let mut records = Vec::new();
        for rec in rdr.records() {
            let rec =
                rec.with_context(|| format!("failed to read record from {}", path.display()))?;
            records.push(rec);
        }
        Ok(Self { header, records })
    }

    /// Write the snapshot, replacing any previous file at `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        wtr.write_record(&self.header)?;
        for rec in &self.records {
            wtr.write_record(rec)?;
        }
        wtr.flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;
        Ok(())
    }

    pub fn header(&self) -> &StringRecord {
        &self.header
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a named column in the header.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| anyhow!("column {column:?} not present in header {:?}", self.header))
    }

    /// All values of a named column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(column)?;
        Ok(self
            .records
            .iter()
            .map(|rec| rec.get(idx).unwrap_or(""))
            .collect())
    }
}

struct CacheEntry {
    modified: SystemTime,
    snapshot: Arc<Snapshot>,
}

/// Explicit memoizing loader keyed by file path.
///
/// Invalidation happens only when the file's modification time changes;
/// nothing is evicted otherwise. Short-lived batch runs share one cache so
/// reference snapshots (cleaned users/movies) are parsed at most once.
#[derive(Default)]
pub struct SnapshotCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, reusing the cached parse when the file is unchanged.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Snapshot>> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("failed to stat {}", path.display()))?;

        if let Some(entry) = self.entries.get(path) {
            if entry.modified == modified {
                return Ok(Arc::clone(&entry.snapshot));
            }
            debug!(target = "snapshot", path = %path.display(), "mtime changed; reloading");
        }

        let snapshot = Arc::new(Snapshot::read(path)?);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                modified,
                snapshot: Arc::clone(&snapshot),
            },
        );
        Ok(snapshot)
    }

    /// Drop any cached parse for `path`.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }
}
