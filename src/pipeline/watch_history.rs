//! Watch-history cleaning pipeline. Same reference checks as ratings, plus
//! the device-type whitelist and the watch-duration bound.

use super::required;
use crate::dedupe::dedupe_exact;
use crate::refcheck::KeySet;
use crate::report::{CleanReport, DropReason};
use crate::snapshot::SnapshotCache;
use crate::validate;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const HEADER: [&str; 5] = [
    "user_id",
    "movie_id",
    "device_type",
    "watch_duration",
    "watch_date",
];

/// The only device types the service records.
pub const DEVICE_TYPES: [&str; 3] = ["Laptop", "Smart TV", "Mobile"];

/// Upper bound on a single watch session, in minutes.
pub const MAX_WATCH_DURATION: f64 = 270.0;

#[derive(Debug, Deserialize)]
struct RawWatchRow {
    user_id: Option<String>,
    movie_id: Option<String>,
    device_type: Option<String>,
    watch_duration: Option<String>,
    watch_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WatchRow {
    user_id: String,
    movie_id: String,
    device_type: String,
    watch_duration: String,
    watch_date: String,
}

/// Clean `watch_history.csv` into `cleaned_watch_history.csv`.
pub fn clean_watch_history(
    input: &Path,
    users: &Path,
    movies: &Path,
    output: &Path,
    cache: &mut SnapshotCache,
) -> Result<CleanReport> {
    let user_keys = KeySet::from_snapshot(&*cache.load(users)?, "user_id")?;
    let movie_keys = KeySet::from_snapshot(&*cache.load(movies)?, "movie_id")?;

    let mut rdr = csv::Reader::from_path(input)
        .with_context(|| format!("failed to open {}", input.display()))?;

    let mut report = CleanReport::new("watch_history");
    let mut rows: Vec<WatchRow> = Vec::new();

    for rec in rdr.deserialize() {
        report.input_rows += 1;
        let raw: RawWatchRow = match rec {
            Ok(r) => r,
            Err(err) => {
                debug!(target = "clean", %err, "skipping malformed watch_history row");
                report.record_drop(DropReason::MissingField);
                continue;
            }
        };

        let (Some(user_id), Some(movie_id), Some(device_type), Some(watch_duration), Some(watch_date)) = (
            required(raw.user_id),
            required(raw.movie_id),
            required(raw.device_type),
            required(raw.watch_duration),
            required(raw.watch_date),
        ) else {
            report.record_drop(DropReason::MissingField);
            continue;
        };

        if !DEVICE_TYPES.contains(&device_type.as_str()) {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        let duration_ok = watch_duration
            .trim()
            .parse::<f64>()
            .is_ok_and(|d| validate::in_range(d, 0.0, MAX_WATCH_DURATION));
        if !duration_ok {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        if validate::parse_timestamp(&watch_date).is_none() {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        if !user_keys.contains(&user_id) || !movie_keys.contains(&movie_id) {
            report.record_drop(DropReason::Unreferenced);
            continue;
        }

        rows.push(WatchRow {
            user_id,
            movie_id,
            device_type,
            watch_duration,
            watch_date,
        });
    }

    let (rows, dropped) = dedupe_exact(rows);
    report.record_drops(DropReason::Duplicate, dropped);

    let mut wtr = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    wtr.write_record(HEADER)?;
    for r in &rows {
        wtr.write_record([
            r.user_id.as_str(),
            r.movie_id.as_str(),
            r.device_type.as_str(),
            r.watch_duration.as_str(),
            r.watch_date.as_str(),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", output.display()))?;

    report.kept_rows = rows.len();
    report.log();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;

    const USERS: &str = "user_id,name,email,country,age,date\n\
                         1,Ann,a@b.com,Germany,30,2024-01-01\n";
    const MOVIES: &str = "movie_id,title,release_year,runtime,genre\n\
                          5,X,2000,90,Action\n";

    fn run(raw: &str) -> (Snapshot, CleanReport) {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("cleaned_users.csv");
        let movies = dir.path().join("cleaned_movies.csv");
        let input = dir.path().join("watch_history.csv");
        let output = dir.path().join("cleaned_watch_history.csv");
        std::fs::write(&users, USERS).unwrap();
        std::fs::write(&movies, MOVIES).unwrap();
        std::fs::write(&input, raw).unwrap();
        let mut cache = SnapshotCache::new();
        let report = clean_watch_history(&input, &users, &movies, &output, &mut cache).unwrap();
        (Snapshot::read(&output).unwrap(), report)
    }

    const HEADER_LINE: &str = "user_id,movie_id,device_type,watch_duration,watch_date\n";

    #[test]
    fn only_whitelisted_devices_survive() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,5,Laptop,60,2024-02-01\n\
             1,5,Smart TV,60,2024-02-01\n\
             1,5,Mobile,60,2024-02-01\n\
             1,5,Console,60,2024-02-01\n\
             1,5,laptop,60,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 3);
        assert_eq!(report.invalid_field, 2);
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,5,Laptop,0,2024-02-01\n\
             1,5,Laptop,270,2024-02-01\n\
             1,5,Laptop,-1,2024-02-01\n\
             1,5,Laptop,271,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 2);
        assert_eq!(report.invalid_field, 2);
    }

    #[test]
    fn referential_checks_apply_before_dedup() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             9,5,Laptop,60,2024-02-01\n\
             9,5,Laptop,60,2024-02-01\n\
             1,5,Laptop,60,2024-02-01\n\
             1,5,Laptop,60,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 1);
        assert_eq!(report.unreferenced, 2);
        assert_eq!(report.duplicate, 1);
    }
}
