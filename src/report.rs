//! Per-run drop accounting. Row-level failures are never raised; they are
//! counted here so a run's aggregate effect stays observable.

use serde::Serialize;
use tracing::info;

/// Why a row was excluded from the cleaned snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A required column value was absent or empty.
    MissingField,
    /// A range/format/set-membership check failed.
    InvalidField,
    /// A foreign key was absent from the reference key set.
    Unreferenced,
    /// The row duplicated an earlier one (exactly, or on the dedup key).
    Duplicate,
}

/// Summary of one pipeline run, reported once at the end.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanReport {
    pub dataset: String,
    pub input_rows: usize,
    pub kept_rows: usize,
    pub missing_field: usize,
    pub invalid_field: usize,
    pub unreferenced: usize,
    pub duplicate: usize,
}

impl CleanReport {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingField => self.missing_field += 1,
            DropReason::InvalidField => self.invalid_field += 1,
            DropReason::Unreferenced => self.unreferenced += 1,
            DropReason::Duplicate => self.duplicate += 1,
        }
    }

    pub fn record_drops(&mut self, reason: DropReason, count: usize) {
        for _ in 0..count {
            self.record_drop(reason);
        }
    }

    pub fn dropped_rows(&self) -> usize {
        self.missing_field + self.invalid_field + self.unreferenced + self.duplicate
    }

    /// Emit the final per-reason counts at info level.
    pub fn log(&self) {
        info!(
            target = "clean",
            dataset = %self.dataset,
            input_rows = self.input_rows,
            kept_rows = self.kept_rows,
            missing_field = self.missing_field,
            invalid_field = self.invalid_field,
            unreferenced = self.unreferenced,
            duplicate = self.duplicate,
            "pipeline run complete"
        );
    }
}
