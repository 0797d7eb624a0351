//! Seams between the coordinator and the extractors.
//!
//! The coordinator only sees these traits, so tests drive it with scripted
//! fakes and the binary plugs in the live extractors.

use std::collections::HashMap;

use async_trait::async_trait;

use laxsched_core::{Game, GameDetail, GameOdds, RankingsPayload};
use laxsched_scraper::{
    GameDetailExtractor, OddsEnricher, RankingsExtractor, ScheduleExtractor, ScraperError,
};

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_games(&self) -> Result<Vec<Game>, ScraperError>;
}

#[async_trait]
pub trait RankingsSource: Send + Sync {
    async fn fetch_rankings(&self) -> Result<RankingsPayload, ScraperError>;
}

/// Best-effort odds lookup keyed by game id. Must not fail.
#[async_trait]
pub trait GameEnricher: Send + Sync {
    async fn odds_for(&self, games: &[Game]) -> HashMap<String, GameOdds>;
}

#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Canonical absolute URL for a (possibly relative) detail link.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] for links the source will not
    /// fetch.
    fn resolve(&self, detail_url: &str) -> Result<String, ScraperError>;

    async fn fetch_detail(&self, url: &str) -> Result<GameDetail, ScraperError>;
}

#[async_trait]
impl ScheduleSource for ScheduleExtractor {
    async fn fetch_games(&self) -> Result<Vec<Game>, ScraperError> {
        self.extract().await
    }
}

#[async_trait]
impl RankingsSource for RankingsExtractor {
    async fn fetch_rankings(&self) -> Result<RankingsPayload, ScraperError> {
        self.extract().await
    }
}

#[async_trait]
impl GameEnricher for OddsEnricher {
    async fn odds_for(&self, games: &[Game]) -> HashMap<String, GameOdds> {
        self.enrich(games).await
    }
}

#[async_trait]
impl DetailSource for GameDetailExtractor {
    fn resolve(&self, detail_url: &str) -> Result<String, ScraperError> {
        GameDetailExtractor::resolve(self, detail_url)
    }

    async fn fetch_detail(&self, url: &str) -> Result<GameDetail, ScraperError> {
        self.extract(url).await
    }
}

/// Enricher that never finds odds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOdds;

#[async_trait]
impl GameEnricher for NoOdds {
    async fn odds_for(&self, _games: &[Game]) -> HashMap<String, GameOdds> {
        HashMap::new()
    }
}
