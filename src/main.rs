use anyhow::Result;
use clap::{Parser, Subcommand};
use gflix_clean::analytics;
use gflix_clean::pipeline::{
    movies, ratings, users, watch_history, CLEANED_MOVIES, CLEANED_RATINGS, CLEANED_USERS,
    CLEANED_WATCH_HISTORY, COUNTRY_COORDINATES, RAW_MOVIES, RAW_RATINGS, RAW_USERS,
    RAW_WATCH_HISTORY,
};
use gflix_clean::report::CleanReport;
use gflix_clean::snapshot::SnapshotCache;
use gflix_clean::tracing::init_tracing;
use gflix_clean::util::env as env_util;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gflix", version, about = "GFlix dataset cleaning CLI")]
struct Cli {
    /// Directory holding the raw snapshots (default: GFLIX_DATA_DIR or ".")
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Directory receiving the cleaned snapshots (default: GFLIX_OUT_DIR or the data dir)
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,
    /// Emit results as JSON instead of the plain summary
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Clean users.csv into cleaned_users.csv
    Users,
    /// Clean movies.csv into cleaned_movies.csv (genre merge + sort)
    Movies,
    /// Clean ratings.csv against the cleaned users/movies snapshots
    Ratings,
    /// Clean watch_history.csv against the cleaned users/movies snapshots
    WatchHistory,
    /// Run all four pipelines in dependency order
    All,
    /// Read-only aggregate views over the cleaned snapshots
    Stats {
        /// Restrict the per-movie views to this movie id
        #[arg(long)]
        movie_id: Option<String>,
    },
}

fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info")?;
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(env_util::data_dir);
    let out_dir = cli
        .out_dir
        .clone()
        .or_else(|| env_util::env_opt("GFLIX_OUT_DIR").map(PathBuf::from))
        .unwrap_or_else(|| data_dir.clone());
    env_util::bootstrap_cli("gflix", &data_dir, &out_dir);

    let mut cache = SnapshotCache::new();
    let raw = |name: &str| data_dir.join(name);
    let cleaned = |name: &str| out_dir.join(name);

    let reports = match &cli.command {
        Commands::Users => vec![users::clean_users(
            &raw(RAW_USERS),
            &cleaned(CLEANED_USERS),
        )?],
        Commands::Movies => vec![movies::clean_movies(
            &raw(RAW_MOVIES),
            &cleaned(CLEANED_MOVIES),
        )?],
        Commands::Ratings => vec![ratings::clean_ratings(
            &raw(RAW_RATINGS),
            &cleaned(CLEANED_USERS),
            &cleaned(CLEANED_MOVIES),
            &cleaned(CLEANED_RATINGS),
            &mut cache,
        )?],
        Commands::WatchHistory => vec![watch_history::clean_watch_history(
            &raw(RAW_WATCH_HISTORY),
            &cleaned(CLEANED_USERS),
            &cleaned(CLEANED_MOVIES),
            &cleaned(CLEANED_WATCH_HISTORY),
            &mut cache,
        )?],
        Commands::All => {
            // Users and movies first; ratings and watch-history read their
            // cleaned outputs for the referential checks.
            let mut reports = vec![
                users::clean_users(&raw(RAW_USERS), &cleaned(CLEANED_USERS))?,
                movies::clean_movies(&raw(RAW_MOVIES), &cleaned(CLEANED_MOVIES))?,
            ];
            reports.push(ratings::clean_ratings(
                &raw(RAW_RATINGS),
                &cleaned(CLEANED_USERS),
                &cleaned(CLEANED_MOVIES),
                &cleaned(CLEANED_RATINGS),
                &mut cache,
            )?);
            reports.push(watch_history::clean_watch_history(
                &raw(RAW_WATCH_HISTORY),
                &cleaned(CLEANED_USERS),
                &cleaned(CLEANED_MOVIES),
                &cleaned(CLEANED_WATCH_HISTORY),
                &mut cache,
            )?);
            reports
        }
        Commands::Stats { movie_id } => {
            return print_stats(
                &out_dir,
                &data_dir.join(COUNTRY_COORDINATES),
                movie_id.as_deref(),
                cli.json,
                &mut cache,
            );
        }
    };

    print_reports(&reports, cli.json)?;
    Ok(())
}

fn print_reports(reports: &[CleanReport], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    println!(
        "{:>14} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "dataset", "input", "kept", "missing", "invalid", "unref", "dup"
    );
    for r in reports {
        println!(
            "{:>14} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            r.dataset, r.input_rows, r.kept_rows, r.missing_field, r.invalid_field,
            r.unreferenced, r.duplicate
        );
    }
    Ok(())
}

fn print_stats(
    out_dir: &Path,
    coordinates: &Path,
    movie_id: Option<&str>,
    as_json: bool,
    cache: &mut SnapshotCache,
) -> Result<()> {
    let users = cache.load(&out_dir.join(CLEANED_USERS))?;
    let movies = cache.load(&out_dir.join(CLEANED_MOVIES))?;
    let ratings = cache.load(&out_dir.join(CLEANED_RATINGS))?;
    let watch = cache.load(&out_dir.join(CLEANED_WATCH_HISTORY))?;
    let coords = cache.load(coordinates)?;

    let total = analytics::total_users(&users);
    let by_country = analytics::users_by_country(&users, &coords)?;
    let trends = env_util::env_flag("GFLIX_STATS_TRENDS", true)
        .then(|| analytics::genre_watch_trends(&watch, &movies))
        .transpose()?;
    info!(target = "stats", total_users = total, countries = by_country.len(), "loaded cleaned snapshots");

    let reviews_limit: usize = env_util::env_parse("GFLIX_LATEST_REVIEWS_LIMIT", 10);
    let per_movie = match movie_id {
        Some(id) => Some((
            id.to_string(),
            analytics::mean_rating(&ratings, id)?,
            analytics::watch_duration_by_device(&watch, id)?,
            analytics::latest_reviews(&ratings, &users, &movies, id, reviews_limit)?,
        )),
        None => None,
    };

    if as_json {
        let mut doc = json!({
            "total_users": total,
            "users_by_country": by_country,
        });
        if let Some(trends) = &trends {
            doc["genre_watch_trends"] = json!(trends);
        }
        if let Some((id, mean, by_device, reviews)) = &per_movie {
            doc["movie_id"] = json!(id);
            doc["mean_rating"] = json!(mean);
            doc["watch_duration_by_device"] = json!(by_device);
            doc["latest_reviews"] = json!(reviews);
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Total users: {total}");
    println!("Users by country:");
    for usage in &by_country {
        match (usage.latitude, usage.longitude) {
            (Some(lat), Some(lon)) => println!(
                "  {:>30} {:>6}  ({:.2}, {:.2})",
                usage.country, usage.users, lat, lon
            ),
            _ => println!("  {:>30} {:>6}", usage.country, usage.users),
        }
    }
    if let Some(trends) = &trends {
        println!("Watches per month and genre:");
        for (month, genres) in trends {
            for (genre, count) in genres {
                println!("  {month}  {genre}: {count}");
            }
        }
    }
    if let Some((id, mean, by_device, reviews)) = &per_movie {
        match mean {
            Some(mean) => println!("Average rating for movie {id}: {mean:.2}"),
            None => println!("Average rating for movie {id}: no ratings yet"),
        }
        println!("Average watch duration per device for movie {id}:");
        for (device, minutes) in by_device {
            println!("  {device:>10}: {minutes:>7.1} min");
        }
        if reviews.is_empty() {
            println!("No reviews available for movie {id} yet");
        } else {
            println!("Latest reviews for movie {id}:");
            for review in reviews {
                println!(
                    "  {}  {} on {}: {}",
                    review.review_date.format("%Y-%m-%d %H:%M:%S"),
                    review.user_name,
                    review.movie_title,
                    review.rating
                );
            }
        }
    }
    Ok(())
}
