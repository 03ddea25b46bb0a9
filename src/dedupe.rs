//! Order-preserving deduplication. Among equal rows the one appearing
//! earliest in input order survives; that is the sole tie-break rule.

use std::collections::HashSet;
use std::hash::Hash;

/// Drop rows whose key was already seen, keeping the first occurrence.
/// Returns the surviving rows and the number dropped.
pub fn dedupe_by_key<T, K, F>(rows: Vec<T>, mut key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let before = rows.len();
    let mut seen: HashSet<K> = HashSet::with_capacity(before);
    let mut kept = Vec::with_capacity(before);
    for row in rows {
        if seen.insert(key(&row)) {
            kept.push(row);
        }
    }
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Drop rows that are exact duplicates across all columns, keeping the first
/// occurrence.
pub fn dedupe_exact<T>(rows: Vec<T>) -> (Vec<T>, usize)
where
    T: Clone + Eq + Hash,
{
    dedupe_by_key(rows, |row| row.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_by_key() {
        let rows = vec![("1", "a"), ("2", "b"), ("1", "c"), ("3", "d")];
        let (kept, dropped) = dedupe_by_key(rows, |r| r.0);
        assert_eq!(kept, vec![("1", "a"), ("2", "b"), ("3", "d")]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn exact_dedup_only_removes_identical_rows() {
        let rows = vec![("1", "a"), ("1", "a"), ("1", "b")];
        let (kept, dropped) = dedupe_exact(rows);
        assert_eq!(kept, vec![("1", "a"), ("1", "b")]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn dedup_is_idempotent() {
        let rows = vec![(1, "x"), (2, "y"), (1, "x"), (1, "z")];
        let (first, _) = dedupe_exact(rows);
        let (second, dropped) = dedupe_exact(first.clone());
        assert_eq!(first, second);
        assert_eq!(dropped, 0);
    }
}
