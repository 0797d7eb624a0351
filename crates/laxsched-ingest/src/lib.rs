//! Ingestion coordination: runs the extractors, persists their results and
//! keeps the per-domain status record.

mod coordinator;
pub mod error;
pub mod sources;

pub use coordinator::{CachedGames, CachedRankings, GamesView, ScrapeCoordinator, Sources};
pub use error::IngestError;
pub use sources::{DetailSource, GameEnricher, NoOdds, RankingsSource, ScheduleSource};
