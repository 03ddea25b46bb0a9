//! The four cleaning pipelines. Each one runs the same fixed sequence:
//! load raw snapshot, drop rows with missing required fields, apply the
//! entity's field validators, filter against already-cleaned references
//! (ratings / watch-history only), deduplicate, then persist the cleaned
//! snapshot. Bad rows are counted and dropped, never raised; only file I/O
//! failures abort a run.

pub mod movies;
pub mod ratings;
pub mod users;
pub mod watch_history;

pub const RAW_USERS: &str = "users.csv";
pub const RAW_MOVIES: &str = "movies.csv";
pub const RAW_RATINGS: &str = "ratings.csv";
pub const RAW_WATCH_HISTORY: &str = "watch_history.csv";
pub const COUNTRY_COORDINATES: &str = "country_coordinates.csv";

pub const CLEANED_USERS: &str = "cleaned_users.csv";
pub const CLEANED_MOVIES: &str = "cleaned_movies.csv";
pub const CLEANED_RATINGS: &str = "cleaned_ratings.csv";
pub const CLEANED_WATCH_HISTORY: &str = "cleaned_watch_history.csv";

/// Treat absent and blank-only values the same way pandas' `dropna` does
/// after CSV ingestion: both mean the field is missing.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
