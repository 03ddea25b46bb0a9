//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Common bootstrap for the CLI: initialize dotenv/env once and log the
/// dataset directories the run will actually use (after any CLI overrides),
/// so runs are reproducible from the log alone.
pub fn bootstrap_cli(bin_name: &str, data_dir: &Path, out_dir: &Path) {
    init_env();
    info!(
        target = "bootstrap",
        bin = bin_name,
        data_dir = %data_dir.display(),
        out_dir = %out_dir.display(),
        "resolved dataset directories"
    );
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Directory holding the raw input snapshots (GFLIX_DATA_DIR, default ".").
pub fn data_dir() -> PathBuf {
    PathBuf::from(env_opt("GFLIX_DATA_DIR").unwrap_or_else(|| ".".into()))
}

/// Directory receiving the cleaned snapshots (GFLIX_OUT_DIR, default: data dir).
pub fn out_dir() -> PathBuf {
    env_opt("GFLIX_OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_accepts_common_truthy_spellings() {
        unsafe {
            std::env::set_var("GFLIX_TEST_FLAG", "Yes");
        }
        assert!(env_flag("GFLIX_TEST_FLAG", false));
        unsafe {
            std::env::set_var("GFLIX_TEST_FLAG", "0");
        }
        assert!(!env_flag("GFLIX_TEST_FLAG", true));
        unsafe {
            std::env::remove_var("GFLIX_TEST_FLAG");
        }
        assert!(env_flag("GFLIX_TEST_FLAG", true));
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        unsafe {
            std::env::set_var("GFLIX_TEST_PARSE", "not-a-number");
        }
        assert_eq!(env_parse("GFLIX_TEST_PARSE", 7usize), 7);
        unsafe {
            std::env::remove_var("GFLIX_TEST_PARSE");
        }
    }
}
