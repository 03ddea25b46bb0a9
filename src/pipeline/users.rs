//! Users cleaning pipeline. No upstream dependencies; every other pipeline
//! referentially checks against its output.

use super::required;
use crate::dedupe::dedupe_by_key;
use crate::report::{CleanReport, DropReason};
use crate::validate;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const HEADER: [&str; 6] = ["user_id", "name", "email", "country", "age", "date"];

#[derive(Debug, Deserialize)]
struct RawUserRow {
    user_id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    country: Option<String>,
    age: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Clone)]
struct UserRow {
    user_id: String,
    name: String,
    email: String,
    country: String,
    age: String,
    date: String,
}

/// Clean `users.csv` into `cleaned_users.csv`.
///
/// Kept rows carry a unique `user_id`, a syntactically valid email with no
/// adjacent dots, an age in [1,100], a parseable signup date, and a country
/// present in the canonical set (rewritten to its normalized spelling; every
/// other column is preserved verbatim).
pub fn clean_users(input: &Path, output: &Path) -> Result<CleanReport> {
    let mut rdr = csv::Reader::from_path(input)
        .with_context(|| format!("failed to open {}", input.display()))?;

    let mut report = CleanReport::new("users");
    let mut rows: Vec<UserRow> = Vec::new();

    for rec in rdr.deserialize() {
        report.input_rows += 1;
        let raw: RawUserRow = match rec {
            Ok(r) => r,
            Err(err) => {
                debug!(target = "clean", %err, "skipping malformed users row");
                report.record_drop(DropReason::MissingField);
                continue;
            }
        };

        let (Some(user_id), Some(name), Some(email), Some(country), Some(age), Some(date)) = (
            required(raw.user_id),
            required(raw.name),
            required(raw.email),
            required(raw.country),
            required(raw.age),
            required(raw.date),
        ) else {
            report.record_drop(DropReason::MissingField);
            continue;
        };

        if !validate::valid_email(&email) {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        let age_ok = age
            .trim()
            .parse::<i64>()
            .is_ok_and(|a| validate::in_range(a as f64, 1.0, 100.0));
        if !age_ok {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        if validate::parse_timestamp(&date).is_none() {
            report.record_drop(DropReason::InvalidField);
            continue;
        }
        let Some(country) = validate::normalize_country(&country) else {
            report.record_drop(DropReason::InvalidField);
            continue;
        };

        rows.push(UserRow {
            user_id,
            name,
            email,
            country,
            age,
            date,
        });
    }

    let (rows, dropped) = dedupe_by_key(rows, |r| r.user_id.clone());
    report.record_drops(DropReason::Duplicate, dropped);

    let mut wtr = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    wtr.write_record(HEADER)?;
    for r in &rows {
        wtr.write_record([
            r.user_id.as_str(),
            r.name.as_str(),
            r.email.as_str(),
            r.country.as_str(),
            r.age.as_str(),
            r.date.as_str(),
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

    fn run(raw: &str) -> (Snapshot, CleanReport) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("users.csv");
        let output = dir.path().join("cleaned_users.csv");
        std::fs::write(&input, raw).unwrap();
        let report = clean_users(&input, &output).unwrap();
        (Snapshot::read(&output).unwrap(), report)
    }

    const HEADER_LINE: &str = "user_id,name,email,country,age,date\n";

    #[test]
    fn drops_double_dot_email_and_normalizes_country() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,Ann,a..b@x.com,Germany,30,2024-01-01\n\
             2,Bob,a@b.com, united states ,30,2024-01-01\n"
        ));
        assert_eq!(report.input_rows, 2);
        assert_eq!(report.invalid_field, 1);
        assert_eq!(snap.len(), 1);
        let row = &snap.records()[0];
        assert_eq!(row.get(0), Some("2"));
        assert_eq!(row.get(3), Some("United States"));
    }

    #[test]
    fn unrecognized_country_is_dropped_not_corrected() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}1,Ann,a@b.com, usa ,30,2024-01-01\n"
        ));
        assert_eq!(snap.len(), 0);
        assert_eq!(report.invalid_field, 1);
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,Ann,a@b.com,Germany,1,2024-01-01\n\
             2,Bob,b@b.com,Germany,100,2024-01-01\n\
             3,Cal,c@b.com,Germany,0,2024-01-01\n\
             4,Dee,d@b.com,Germany,101,2024-01-01\n"
        ));
        assert_eq!(snap.len(), 2);
        assert_eq!(report.invalid_field, 2);
    }

    #[test]
    fn missing_and_unparseable_fields_drop_the_row() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,Ann,a@b.com,Germany,30,\n\
             2,,b@b.com,Germany,30,2024-01-01\n\
             3,Cal,c@b.com,Germany,30,never\n\
             4,Dee,d@b.com,Germany,30,2024-01-01\n"
        ));
        assert_eq!(snap.len(), 1);
        assert_eq!(report.missing_field, 2);
        assert_eq!(report.invalid_field, 1);
    }

    #[test]
    fn duplicate_user_ids_keep_first_occurrence() {
        let (snap, report) = run(&format!(
            "{HEADER_LINE}\
             1,Ann,a@b.com,Germany,30,2024-01-01\n\
             1,Ann Again,z@b.com,France,40,2024-02-02\n"
        ));
        assert_eq!(snap.len(), 1);
        assert_eq!(report.duplicate, 1);
        assert_eq!(snap.records()[0].get(1), Some("Ann"));
    }
}
