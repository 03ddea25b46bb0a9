//! Referential filtering: foreign keys must exist in an already-cleaned
//! reference snapshot before a row is accepted.

use crate::snapshot::Snapshot;
use anyhow::Result;
use std::collections::HashSet;

/// Unique identifiers extracted from one key column of a reference snapshot.
#[derive(Debug, Clone)]
pub struct KeySet {
    column: String,
    keys: HashSet<String>,
}

impl KeySet {
    /// Build the key set from `column` of a cleaned reference snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, column: &str) -> Result<Self> {
        let keys = snapshot
            .column_values(column)?
            .into_iter()
            .map(str::to_owned)
            .collect();
        Ok(Self {
            column: column.to_owned(),
            keys,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
