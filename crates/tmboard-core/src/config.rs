use std::net::SocketAddr;
use std::str::FromStr;

use chrono::NaiveTime;

use crate::app_config::{AppConfig, Environment, EventSchedule, RefreshSettings};
use crate::{ConfigError, MalformedRowPolicy};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let results_url = require("TMBOARD_RESULTS_URL")?;
    let maps_url = require("TMBOARD_MAPS_URL")?;

    let env = parse_environment(&or_default("TMBOARD_ENV", "development"));
    let bind_addr: SocketAddr = parse_var(
        "TMBOARD_BIND_ADDR",
        &or_default("TMBOARD_BIND_ADDR", "0.0.0.0:3000"),
    )?;
    let log_level = or_default("TMBOARD_LOG_LEVEL", "info");

    let db_max_connections = parse_var(
        "TMBOARD_DB_MAX_CONNECTIONS",
        &or_default("TMBOARD_DB_MAX_CONNECTIONS", "5"),
    )?;
    let db_min_connections = parse_var(
        "TMBOARD_DB_MIN_CONNECTIONS",
        &or_default("TMBOARD_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_var(
        "TMBOARD_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("TMBOARD_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let scraper_request_timeout_secs = parse_var(
        "TMBOARD_SCRAPER_REQUEST_TIMEOUT_SECS",
        &or_default("TMBOARD_SCRAPER_REQUEST_TIMEOUT_SECS", "30"),
    )?;
    let scraper_user_agent = or_default(
        "TMBOARD_SCRAPER_USER_AGENT",
        "tmboard/0.1 (leaderboard-sync)",
    );
    let scraper_max_retries = parse_var(
        "TMBOARD_SCRAPER_MAX_RETRIES",
        &or_default("TMBOARD_SCRAPER_MAX_RETRIES", "1"),
    )?;
    let scraper_retry_backoff_base_secs = parse_var(
        "TMBOARD_SCRAPER_RETRY_BACKOFF_BASE_SECS",
        &or_default("TMBOARD_SCRAPER_RETRY_BACKOFF_BASE_SECS", "5"),
    )?;

    let period_secs: u64 = parse_var(
        "TMBOARD_REFRESH_PERIOD_SECS",
        &or_default("TMBOARD_REFRESH_PERIOD_SECS", "310"),
    )?;
    if period_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "TMBOARD_REFRESH_PERIOD_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let event_pause_secs = parse_var(
        "TMBOARD_EVENT_PAUSE_SECS",
        &or_default("TMBOARD_EVENT_PAUSE_SECS", "60"),
    )?;

    let start_raw = or_default("TMBOARD_EVENT_START_UTC", "17:00");
    let start_utc = NaiveTime::parse_from_str(start_raw.trim(), "%H:%M").map_err(|e| {
        ConfigError::InvalidEnvVar {
            var: "TMBOARD_EVENT_START_UTC".to_string(),
            reason: format!("expected HH:MM, {e}"),
        }
    })?;
    let guard_secs = parse_var(
        "TMBOARD_EVENT_GUARD_SECS",
        &or_default("TMBOARD_EVENT_GUARD_SECS", "900"),
    )?;

    let malformed_rows: MalformedRowPolicy = parse_var(
        "TMBOARD_MALFORMED_ROWS",
        &or_default("TMBOARD_MALFORMED_ROWS", "abort"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        results_url,
        maps_url,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        refresh: RefreshSettings {
            period_secs,
            event_pause_secs,
        },
        event: EventSchedule {
            start_utc,
            guard_secs,
        },
        malformed_rows,
    })
}

/// Parses `raw` with `T::from_str`, attributing failures to `var`.
fn parse_var<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
