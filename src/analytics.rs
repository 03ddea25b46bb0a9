//! Read-only aggregates over the cleaned snapshots, backing the dashboard.
//! Nothing here mutates a cleaned file; every view is recomputed from the
//! snapshots handed in.

use crate::pipeline::watch_history::DEVICE_TYPES;
use crate::snapshot::Snapshot;
use crate::validate;
use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Total number of cleaned users.
pub fn total_users(users: &Snapshot) -> usize {
    users.len()
}

/// Mean rating for one movie; `None` when it has no ratings.
pub fn mean_rating(ratings: &Snapshot, movie_id: &str) -> Result<Option<f64>> {
    let movie_col = ratings.column_index("movie_id")?;
    let rating_col = ratings.column_index("rating")?;
    let mut sum = 0.0;
    let mut count = 0usize;
    for rec in ratings.records() {
        if rec.get(movie_col) != Some(movie_id) {
            continue;
        }
        if let Some(value) = rec.get(rating_col).and_then(|v| v.trim().parse::<f64>().ok()) {
            sum += value;
            count += 1;
        }
    }
    Ok((count > 0).then(|| sum / count as f64))
}

/// Mean watch duration per device for one movie. Every known device type is
/// always present; devices with no sessions report 0. Sorted ascending by
/// duration, matching the dashboard's bar-chart ordering.
pub fn watch_duration_by_device(watch: &Snapshot, movie_id: &str) -> Result<Vec<(String, f64)>> {
    let movie_col = watch.column_index("movie_id")?;
    let device_col = watch.column_index("device_type")?;
    let duration_col = watch.column_index("watch_duration")?;

    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for rec in watch.records() {
        if rec.get(movie_col) != Some(movie_id) {
            continue;
        }
        let (Some(device), Some(duration)) = (
            rec.get(device_col),
            rec.get(duration_col)
                .and_then(|v| v.trim().parse::<f64>().ok()),
        ) else {
            continue;
        };
        let entry = sums.entry(device).or_insert((0.0, 0));
        entry.0 += duration;
        entry.1 += 1;
    }

    let mut out: Vec<(String, f64)> = DEVICE_TYPES
        .iter()
        .map(|device| {
            let mean = sums
                .get(device)
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(0.0);
            (device.to_string(), mean)
        })
        .collect();
    out.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(out)
}

/// Watch counts grouped by month (`YYYY-MM`) and the movie's genre string,
/// for the genre-popularity-over-time view.
pub fn genre_watch_trends(
    watch: &Snapshot,
    movies: &Snapshot,
) -> Result<BTreeMap<String, BTreeMap<String, usize>>> {
    let movie_col = watch.column_index("movie_id")?;
    let date_col = watch.column_index("watch_date")?;
    let movies_id_col = movies.column_index("movie_id")?;
    let genre_col = movies.column_index("genre")?;

    let genres: HashMap<&str, &str> = movies
        .records()
        .iter()
        .filter_map(|rec| Some((rec.get(movies_id_col)?, rec.get(genre_col)?)))
        .collect();

    let mut trends: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for rec in watch.records() {
        let Some(genre) = rec.get(movie_col).and_then(|id| genres.get(id)) else {
            continue;
        };
        let Some(ts) = rec.get(date_col).and_then(validate::parse_timestamp) else {
            continue;
        };
        let month = ts.format("%Y-%m").to_string();
        *trends
            .entry(month)
            .or_default()
            .entry(genre.to_string())
            .or_default() += 1;
    }
    Ok(trends)
}

/// One review row joined with the reviewer's name and the movie title.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub user_name: String,
    pub movie_title: String,
    pub rating: String,
    pub review_date: NaiveDateTime,
}

/// The most recent reviews for one movie: ratings joined to users on
/// `user_id` and movies on `movie_id`, newest first, at most `limit` rows.
/// Rows whose user or movie is absent from the joined snapshots are skipped,
/// as are rows whose review date does not parse.
pub fn latest_reviews(
    ratings: &Snapshot,
    users: &Snapshot,
    movies: &Snapshot,
    movie_id: &str,
    limit: usize,
) -> Result<Vec<Review>> {
    let user_col = ratings.column_index("user_id")?;
    let movie_col = ratings.column_index("movie_id")?;
    let rating_col = ratings.column_index("rating")?;
    let date_col = ratings.column_index("review_date")?;

    let users_id_col = users.column_index("user_id")?;
    let name_col = users.column_index("name")?;
    let names: HashMap<&str, &str> = users
        .records()
        .iter()
        .filter_map(|rec| Some((rec.get(users_id_col)?, rec.get(name_col)?)))
        .collect();

    let movies_id_col = movies.column_index("movie_id")?;
    let title_col = movies.column_index("title")?;
    let titles: HashMap<&str, &str> = movies
        .records()
        .iter()
        .filter_map(|rec| Some((rec.get(movies_id_col)?, rec.get(title_col)?)))
        .collect();

    let mut reviews: Vec<Review> = Vec::new();
    for rec in ratings.records() {
        if rec.get(movie_col) != Some(movie_id) {
            continue;
        }
        let (Some(user_name), Some(movie_title)) = (
            rec.get(user_col).and_then(|id| names.get(id)),
            rec.get(movie_col).and_then(|id| titles.get(id)),
        ) else {
            continue;
        };
        let (Some(rating), Some(review_date)) = (
            rec.get(rating_col),
            rec.get(date_col).and_then(validate::parse_timestamp),
        ) else {
            continue;
        };
        reviews.push(Review {
            user_name: user_name.to_string(),
            movie_title: movie_title.to_string(),
            rating: rating.to_string(),
            review_date,
        });
    }

    reviews.sort_by(|a, b| b.review_date.cmp(&a.review_date));
    reviews.truncate(limit);
    Ok(reviews)
}

/// One country's user count with its map coordinates, when known.
#[derive(Debug, Clone, Serialize)]
pub struct CountryUsage {
    pub country: String,
    pub users: usize,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// User counts per country joined with the static coordinates lookup,
/// ordered by descending user count then name.
pub fn users_by_country(users: &Snapshot, coordinates: &Snapshot) -> Result<Vec<CountryUsage>> {
    let country_col = users.column_index("country")?;
    let coord_country_col = coordinates.column_index("country")?;
    let lat_col = coordinates.column_index("latitude")?;
    let lon_col = coordinates.column_index("longitude")?;

    let coords: HashMap<&str, (Option<f64>, Option<f64>)> = coordinates
        .records()
        .iter()
        .filter_map(|rec| {
            let name = rec.get(coord_country_col)?;
            let lat = rec.get(lat_col).and_then(|v| v.trim().parse().ok());
            let lon = rec.get(lon_col).and_then(|v| v.trim().parse().ok());
            Some((name, (lat, lon)))
        })
        .collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for rec in users.records() {
        if let Some(country) = rec.get(country_col) {
            *counts.entry(country).or_default() += 1;
        }
    }

    let mut out: Vec<CountryUsage> = counts
        .into_iter()
        .map(|(country, users)| {
            let (latitude, longitude) = coords.get(country).copied().unwrap_or((None, None));
            CountryUsage {
                country: country.to_string(),
                users,
                latitude,
                longitude,
            }
        })
        .collect();
    out.sort_by(|a, b| b.users.cmp(&a.users).then_with(|| a.country.cmp(&b.country)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;

    fn snapshot(header: &[&str], rows: &[&[&str]]) -> Snapshot {
        Snapshot::new(
            StringRecord::from(header.to_vec()),
            rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        )
    }

    fn watch_snapshot() -> Snapshot {
        snapshot(
            &["user_id", "movie_id", "device_type", "watch_duration", "watch_date"],
            &[
                &["1", "5", "Laptop", "60", "2024-01-10"],
                &["1", "5", "Laptop", "120", "2024-01-20"],
                &["2", "5", "Mobile", "30", "2024-02-01"],
                &["2", "6", "Smart TV", "200", "2024-02-01"],
            ],
        )
    }

    #[test]
    fn device_means_fill_in_missing_devices() {
        let by_device = watch_duration_by_device(&watch_snapshot(), "5").unwrap();
        assert_eq!(by_device.len(), 3);
        assert_eq!(by_device[0], ("Smart TV".to_string(), 0.0));
        assert_eq!(by_device[1], ("Mobile".to_string(), 30.0));
        assert_eq!(by_device[2], ("Laptop".to_string(), 90.0));
    }

    #[test]
    fn mean_rating_ignores_other_movies() {
        let ratings = snapshot(
            &["user_id", "movie_id", "rating", "review_date"],
            &[
                &["1", "5", "4", "2024-01-01"],
                &["2", "5", "5", "2024-01-02"],
                &["1", "6", "1", "2024-01-03"],
            ],
        );
        assert_eq!(mean_rating(&ratings, "5").unwrap(), Some(4.5));
        assert_eq!(mean_rating(&ratings, "7").unwrap(), None);
    }

    #[test]
    fn trends_group_by_month_and_genre() {
        let movies = snapshot(
            &["movie_id", "title", "release_year", "runtime", "genre"],
            &[
                &["5", "X", "2000", "90", "Action, Drama"],
                &["6", "Y", "2001", "100", "Comedy"],
            ],
        );
        let trends = genre_watch_trends(&watch_snapshot(), &movies).unwrap();
        assert_eq!(trends["2024-01"]["Action, Drama"], 2);
        assert_eq!(trends["2024-02"]["Action, Drama"], 1);
        assert_eq!(trends["2024-02"]["Comedy"], 1);
    }

    #[test]
    fn latest_reviews_join_names_and_titles_newest_first() {
        let ratings = snapshot(
            &["user_id", "movie_id", "rating", "review_date"],
            &[
                &["1", "5", "4", "2024-01-10"],
                &["2", "5", "5", "2024-03-01"],
                &["1", "5", "2", "2024-02-15"],
                &["1", "6", "1", "2024-04-01"],
                &["9", "5", "3", "2024-05-01"],
            ],
        );
        let users = snapshot(
            &["user_id", "name", "email", "country", "age", "date"],
            &[
                &["1", "Ann", "a@b.com", "Germany", "30", "2024-01-01"],
                &["2", "Bob", "b@b.com", "France", "40", "2024-01-01"],
            ],
        );
        let movies = snapshot(
            &["movie_id", "title", "release_year", "runtime", "genre"],
            &[&["5", "X", "2000", "90", "Action"]],
        );

        let reviews = latest_reviews(&ratings, &users, &movies, "5", 2).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].user_name, "Bob");
        assert_eq!(reviews[0].movie_title, "X");
        assert_eq!(reviews[0].rating, "5");
        assert_eq!(reviews[1].user_name, "Ann");
        assert_eq!(reviews[1].rating, "2");

        // Other movies and rows without a joinable user never appear.
        let all = latest_reviews(&ratings, &users, &movies, "5", 10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.movie_title == "X"));
        assert!(all.iter().all(|r| r.user_name != "9"));
    }

    #[test]
    fn country_counts_join_coordinates() {
        let users = snapshot(
            &["user_id", "name", "email", "country", "age", "date"],
            &[
                &["1", "Ann", "a@b.com", "Germany", "30", "2024-01-01"],
                &["2", "Bob", "b@b.com", "Germany", "40", "2024-01-01"],
                &["3", "Cal", "c@b.com", "France", "20", "2024-01-01"],
            ],
        );
        let coords = snapshot(
            &["country", "latitude", "longitude"],
            &[&["Germany", "51.16", "10.45"]],
        );
        let usage = users_by_country(&users, &coords).unwrap();
        assert_eq!(usage[0].country, "Germany");
        assert_eq!(usage[0].users, 2);
        assert_eq!(usage[0].latitude, Some(51.16));
        assert_eq!(usage[1].country, "France");
        assert_eq!(usage[1].latitude, None);
    }
}
