//! Shared domain types and configuration for laxsched.

pub mod app_config;
pub mod cache_keys;
pub mod config;
pub mod games;
pub mod rankings;
pub mod status;

pub use app_config::{AppConfig, Environment, RemoteCacheCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use games::{Game, GameDetail, GameOdds, PlatformSlug, StreamingPlatform, LEAGUE_NAME};
pub use rankings::{RankingCategory, RankingEntry, RankingsPayload};
pub use status::{ScrapeOutcome, ScrapeStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
