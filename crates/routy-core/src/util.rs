//! Utility functions for Routy
//!
//! Provides timestamp parsing, order-preserving deduplication, and
//! environment file loading.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::{Result, RoutyError};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a departure/arrival timestamp into local wall-clock time.
///
/// Accepts RFC 3339 (converted to local time) and ISO-8601 without offset,
/// which is taken as local time already.
///
/// # Example
/// ```
/// use routy_core::util::parse_timestamp;
///
/// let t = parse_timestamp("2024-03-04T08:30:00").unwrap();
/// assert_eq!(t.format("%H:%M").to_string(), "08:30");
/// assert!(parse_timestamp("next tuesday").is_err());
/// ```
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| RoutyError::InvalidInput(format!("malformed timestamp: {value:?}")))
}

/// Current local wall-clock time
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Remove repeated items, keeping each at its first position
///
/// # Example
/// ```
/// use routy_core::util::dedup_first_occurrence;
///
/// let stops = vec!["Y", "X", "Y", "Z", "X"];
/// assert_eq!(dedup_first_occurrence(stops), vec!["Y", "X", "Z"]);
/// ```
pub fn dedup_first_occurrence<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Load environment variables from the Routy env file if not already set.
/// Searches standard locations in order:
/// 1. /usr/local/etc/routy/routy.env
/// 2. User's config directory/routy/routy.env
/// 3. ~/.config/routy/routy.env
pub fn load_env_file() {
    let env_paths = [
        "/usr/local/etc/routy/routy.env".to_string(),
        dirs::config_dir()
            .map(|p| p.join("routy/routy.env").to_string_lossy().to_string())
            .unwrap_or_default(),
        dirs::home_dir()
            .map(|p| p.join(".config/routy/routy.env").to_string_lossy().to_string())
            .unwrap_or_default(),
    ];

    for path in &env_paths {
        if path.is_empty() {
            continue;
        }
        if Path::new(path).exists() {
            if let Ok(contents) = std::fs::read_to_string(path) {
                parse_env_file(&contents);
            }
            break;
        }
    }
}

/// Parse env file contents and set environment variables (only if not already set).
/// Supports formats:
/// - `KEY=value`
/// - `export KEY=value`
/// - `KEY="quoted value"`
/// - `KEY='single quoted'`
/// - Comments starting with #
pub fn parse_env_file(contents: &str) {
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}
