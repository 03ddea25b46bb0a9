//! Movies cleaning pipeline: a movie may arrive as several rows differing
//! only in genre. Those rows collapse into one whose genre field is the
//! sorted, deduplicated, comma-joined union.

use super::required;
use crate::report::{CleanReport, DropReason};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

const HEADER: [&str; 5] = ["movie_id", "title", "release_year", "runtime", "genre"];

#[derive(Debug, Deserialize)]
struct RawMovieRow {
    movie_id: Option<String>,
    title: Option<String>,
    release_year: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
}

struct MovieGroup {
    movie_id: String,
    title: String,
    release_year: String,
    runtime: String,
    year_sort: f64,
    runtime_sort: f64,
    genres: BTreeSet<String>,
}

/// Clean `movies.csv` into `cleaned_movies.csv`.
///
/// Grouping key is the exact `(movie_id, title, release_year, runtime)`
/// string 4-tuple; genre aggregation is order-independent because the union
/// is sorted before joining. Output is sorted by `(release_year, runtime,
/// title)` ascending, year and runtime compared numerically.
pub fn clean_movies(input: &Path, output: &Path) -> Result<CleanReport> {
    let mut rdr = csv::Reader::from_path(input)
        .with_context(|| format!("failed to open {}", input.display()))?;

    let mut report = CleanReport::new("movies");
    let mut groups: IndexMap<(String, String, String, String), MovieGroup> = IndexMap::new();

    for rec in rdr.deserialize() {
        report.input_rows += 1;
        let raw: RawMovieRow = match rec {
            Ok(r) => r,
            Err(err) => {
                debug!(target = "clean", %err, "skipping malformed movies row");
                report.record_drop(DropReason::MissingField);
                continue;
            }
        };

        let (Some(movie_id), Some(title), Some(release_year), Some(runtime), Some(genre)) = (
            required(raw.movie_id),
            required(raw.title),
            required(raw.release_year),
            required(raw.runtime),
            required(raw.genre),
        ) else {
            report.record_drop(DropReason::MissingField);
            continue;
        };

        // Year and runtime must be numeric for the output sort.
        let (Ok(year_sort), Ok(runtime_sort)) = (
            release_year.trim().parse::<f64>(),
            runtime.trim().parse::<f64>(),
        ) else {
            report.record_drop(DropReason::InvalidField);
            continue;
        };

        let key = (
            movie_id.clone(),
            title.clone(),
            release_year.clone(),
            runtime.clone(),
        );
        match groups.entry(key) {
            indexmap::map::Entry::Occupied(mut entry) => {
                entry.get_mut().genres.insert(genre);
                report.record_drop(DropReason::Duplicate);
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(MovieGroup {
                    movie_id,
                    title,
                    release_year,
                    runtime,
                    year_sort,
                    runtime_sort,
                    genres: BTreeSet::from([genre]),
                });
            }
        }
    }

    let mut rows: Vec<MovieGroup> = groups.into_values().collect();
    rows.sort_by(|a, b| {
        a.year_sort
            .total_cmp(&b.year_sort)
            .then(a.runtime_sort.total_cmp(&b.runtime_sort))
            .then_with(|| a.title.cmp(&b.title))
    });

    let mut wtr = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    wtr.write_record(HEADER)?;
    for r in &rows {
        let genre = r.genres.iter().join(", ");
        wtr.write_record([
            r.movie_id.as_str(),
            r.title.as_str(),
            r.release_year.as_str(),
            r.runtime.as_str(),
            genre.as_str(),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", output.display()))?;

    report.kept_rows = rows.len();
    report.log();
    Ok(report)
}
