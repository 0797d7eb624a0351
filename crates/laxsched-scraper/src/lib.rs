//! Polite extraction of college lacrosse schedules, game pages, D1 polls and
//! betting lines.
//!
//! Every content fetch goes through a [`PolicyGate`] robots.txt check first
//! and through a shared [`PageFetcher`] for timeouts, the identifying
//! user-agent and transient-failure retries.

pub mod detail;
pub mod error;
pub mod fetch;
pub mod odds;
pub mod policy;
pub mod rankings;
pub mod retry;
mod robots;
pub mod schedule;
pub mod text;

pub use detail::{parse_game_detail, GameDetailExtractor};
pub use error::ScraperError;
pub use fetch::PageFetcher;
pub use odds::OddsEnricher;
pub use policy::{PolicyGate, POLICY_TTL};
pub use rankings::{default_sources, parse_rankings_table, RankingSource, RankingsExtractor};
pub use retry::{Populated, RetryPolicy};
pub use schedule::{game_id_from_url, parse_schedule, ScheduleExtractor};
