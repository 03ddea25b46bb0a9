//! Pure per-field validators shared by all four cleaning pipelines.

pub mod country;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Timestamp formats accepted across the raw snapshots, tried in order.
/// Date-only inputs resolve to midnight.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

/// Parse a date/time string; unparseable input yields `None` rather than
/// failing the batch.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Inclusive bounds check used for age, rating and watch_duration.
pub fn in_range(value: f64, lo: f64, hi: f64) -> bool {
    (lo..=hi).contains(&value)
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("email regex"))
}

/// Syntactic email check: anchored local@domain.tld shape, and no two
/// adjacent dots anywhere in the value.
pub fn valid_email(value: &str) -> bool {
    email_re().is_match(value) && !value.contains("..")
}

/// Trim and title-case a raw country value, then test exact membership in
/// the canonical country set. `None` means the row should be dropped; no
/// alias or fuzzy correction is attempted.
pub fn normalize_country(value: &str) -> Option<String> {
    let titled = title_case(value.trim());
    if country::is_canonical(&titled) {
        Some(titled)
    } else {
        None
    }
}

/// Title-case in the pandas `.str.title()` sense: any alphabetic character
/// following a non-alphabetic one is uppercased, the rest are lowercased.
/// "united states" -> "United States", "guinea-bissau" -> "Guinea-Bissau".
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
