//! Shared domain types and configuration for the leaderboard snapshot pipeline.

mod app_config;
mod board;
mod config;

pub use app_config::{AppConfig, Environment, EventSchedule, RefreshSettings};
pub use board::{BoardTable, LeaderboardRow, MalformedRowPolicy, MapRow, Snapshot};
pub use config::{load_app_config, load_app_config_from_env};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
