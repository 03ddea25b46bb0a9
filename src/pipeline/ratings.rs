//! Ratings cleaning pipeline. Runs after users and movies: every kept row
//! must reference a user and a movie present in the cleaned snapshots.

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

const HEADER: [&str; 4] = ["user_id", "movie_id", "rating", "review_date"];

#[derive(Debug, Deserialize)]
struct RawRatingRow {
    user_id: Option<String>,
    movie_id: Option<String>,
    rating: Option<String>,
    review_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RatingRow {
    user_id: String,
    movie_id: String,
    rating: String,
    review_date: String,
}

/// Clean `ratings.csv` into `cleaned_ratings.csv`.
///
/// Referential integrity against the cleaned users/movies snapshots holds at
/// write time; exact-duplicate rows are removed, first occurrence wins.
pub fn clean_ratings(
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

    let mut report = CleanReport::new("ratings");
    let mut rows: Vec<RatingRow> = Vec::new();

    for rec in rdr.deserialize() {
        report.input_rows += 1;
        let raw: RawRatingRow = match rec {
            Ok(r) => r,
            Err(err) => {
                debug!(target = "clean", %err, "skipping malformed ratings row");
                report.record_drop(DropReason::MissingField);
                continue;
            }
        };

        let (Some(user_id), Some(movie_id), Some(rating), Some(review_date)) = (
            required(raw.user_id),
            required(raw.movie_id),
            required(raw.rating),
            required(raw.review_date),
        ) else {
            report.record_drop(DropReason::MissingField);
            continue;
        };

        let rating_ok = rating
            .trim()
            .parse::<f64>()
            .is_ok_and(|r| validate::in_range(r, 0.0, 5.0));
        if !rating_ok {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        if validate::parse_timestamp(&review_date).is_none() {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        if !user_keys.contains(&user_id) || !movie_keys.contains(&movie_id) {
            report.record_drop(DropReason::Unreferenced);
            continue;
        }

        rows.push(RatingRow {
            user_id,
            movie_id,
            rating,
            review_date,
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
            r.rating.as_str(),
            r.review_date.as_str(),
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
                         1,Ann,a@b.com,Germany,30,2024-01-01\n\
                         2,Bob,b@b.com,France,40,2024-01-01\n";
    const MOVIES: &str = "movie_id,title,release_year,runtime,genre\n\
                          5,X,2000,90,Action\n";

    fn run(raw: &str) -> (Snapshot, CleanReport) {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("cleaned_users.csv");
        let movies = dir.path().join("cleaned_movies.csv");
        let input = dir.path().join("ratings.csv");
        let output = dir.path().join("cleaned_ratings.csv");
        std::fs::write(&users, USERS).unwrap();
        std::fs::write(&movies, MOVIES).unwrap();
        std::fs::write(&input, raw).unwrap();
        let mut cache = SnapshotCache::new();
        let report = clean_ratings(&input, &users, &movies, &output, &mut cache).unwrap();
        (Snapshot::read(&output).unwrap(), report)
    }

    const HEADER_LINE: &str = "user_id,movie_id,rating,review_date\n";

    #[test]
    fn unknown_movie_is_dropped_despite_valid_rating() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,99,4.5,2024-02-01\n\
             1,5,4.5,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 1);
        assert_eq!(report.unreferenced, 1);
        assert_eq!(snap.records()[0].get(1), Some("5"));
    }

    #[test]
    fn unknown_user_is_dropped() {
        let (snap, report) = run(&format!("{HEADER_LINE}7,5,3,2024-02-01\n"));
        assert_eq!(snap.len(), 0);
        assert_eq!(report.unreferenced, 1);
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,5,0,2024-02-01\n\
             1,5,5,2024-02-01\n\
             2,5,5.1,2024-02-01\n\
             2,5,-1,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 2);
        assert_eq!(report.invalid_field, 2);
    }

    #[test]
    fn exact_duplicates_are_removed_once() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,5,4,2024-02-01\n\
             1,5,4,2024-02-01\n\
             1,5,3,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 2);
        assert_eq!(report.duplicate, 1);
    }

    #[test]
    fn missing_fields_and_bad_dates_are_dropped() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,5,,2024-02-01\n\
             1,5,4,sometime\n\
             1,5,4,2024-02-01\n"
        ));
        assert_eq!(snap.len(), 1);
        assert_eq!(report.missing_field, 1);
        assert_eq!(report.invalid_field, 1);
    }
}
