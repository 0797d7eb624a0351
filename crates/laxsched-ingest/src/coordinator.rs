//! Ingestion runs: extract with retries, enrich, persist, and fall back to
//! the last good snapshot when a run fails.
//!
//! A run never fails outright. Extraction or cache-write errors end the run
//! stale: the previous snapshot is returned and the error message is
//! recorded in the status record, leaving the last success time in place.
//! Concurrent runs of the same domain are not serialized; the last cache
//! writer wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use laxsched_cache::{CacheError, CacheStatus, CacheStore};
use laxsched_core::cache_keys::{self, game_detail_key};
use laxsched_core::{
    AppConfig, Game, GameDetail, RankingEntry, RankingsPayload, ScrapeOutcome, ScrapeStatus,
};
use laxsched_scraper::text::safe_id;
use laxsched_scraper::{
    game_id_from_url, GameDetailExtractor, OddsEnricher, PageFetcher, PolicyGate,
    RankingsExtractor, RetryPolicy, ScheduleExtractor, ScraperError,
};

use crate::error::IngestError;
use crate::sources::{DetailSource, GameEnricher, RankingsSource, ScheduleSource};

/// Cached schedule and when it was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedGames {
    pub games: Vec<Game>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRankings {
    pub mens: Vec<RankingEntry>,
    pub womens: Vec<RankingEntry>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Answer to a schedule read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamesView {
    pub games: Vec<Game>,
    pub last_updated: Option<DateTime<Utc>>,
    pub stale: bool,
}

/// The four extractor seams a coordinator drives.
#[derive(Clone)]
pub struct Sources {
    pub schedule: Arc<dyn ScheduleSource>,
    pub rankings: Arc<dyn RankingsSource>,
    pub enricher: Arc<dyn GameEnricher>,
    pub details: Arc<dyn DetailSource>,
}

impl Sources {
    /// Live extractors sharing one fetcher and one robots.txt cache.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let fetcher = PageFetcher::from_config(config)?;
        let policy = PolicyGate::from_config(fetcher.clone(), config);
        Ok(Self {
            schedule: Arc::new(ScheduleExtractor::from_config(
                fetcher.clone(),
                policy.clone(),
                config,
            )),
            rankings: Arc::new(RankingsExtractor::new(fetcher.clone(), policy.clone())),
            enricher: Arc::new(OddsEnricher::from_config(fetcher.clone(), config)),
            details: Arc::new(GameDetailExtractor::from_config(fetcher, policy, config)),
        })
    }
}

#[derive(Clone)]
pub struct ScrapeCoordinator {
    cache: CacheStore,
    sources: Sources,
    retry: RetryPolicy,
}

impl ScrapeCoordinator {
    #[must_use]
    pub fn new(cache: CacheStore, sources: Sources) -> Self {
        Self {
            cache,
            sources,
            retry: RetryPolicy::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`IngestError`] if the cache backend or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        let cache = CacheStore::from_config(config)?;
        let sources = Sources::from_config(config)?;
        Ok(Self::new(cache, sources).with_retry_policy(RetryPolicy::from_config(config)))
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Games
    // ------------------------------------------------------------------

    /// Run a schedule ingestion.
    pub async fn scrape_games(&self) -> ScrapeOutcome<Vec<Game>> {
        tracing::info!("games scrape starting");
        match self.refresh_games().await {
            Ok((games, updated_at)) => {
                tracing::info!(count = games.len(), "games scrape complete");
                self.update_status(|status| {
                    status.games_last_run = Some(updated_at);
                    status.games_last_error = None;
                })
                .await;
                ScrapeOutcome::fresh(games)
            }
            Err(e) => {
                tracing::error!(error = %e, "games scrape failed; serving cached snapshot");
                let cached = self.cached_games().await.unwrap_or_else(|read_err| {
                    tracing::warn!(error = %read_err, "cached games unreadable");
                    CachedGames::default()
                });
                let message = e.to_string();
                self.update_status(|status| status.games_last_error = Some(message))
                    .await;
                ScrapeOutcome::stale(cached.games)
            }
        }
    }

    async fn refresh_games(&self) -> Result<(Vec<Game>, DateTime<Utc>), IngestError> {
        let schedule = &self.sources.schedule;
        let mut games = self
            .retry
            .run("games", || schedule.fetch_games())
            .await?;

        let mut odds = self.sources.enricher.odds_for(&games).await;
        let now = Utc::now();
        for game in &mut games {
            game.odds = odds.remove(&game.id);
            game.odds_available = game.odds.is_some();
            game.is_live = game.is_live_at(now);
            game.last_updated = now;
        }

        self.cache
            .set_json(cache_keys::GAMES, &games, Some(cache_keys::GAMES_TTL))
            .await?;
        self.cache
            .set_json(cache_keys::GAMES_LAST_UPDATED, &now, Some(cache_keys::GAMES_TTL))
            .await?;
        Ok((games, now))
    }

    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    pub async fn cached_games(&self) -> Result<CachedGames, CacheError> {
        let games = self.cache.get_json(cache_keys::GAMES).await?;
        let last_updated = self.cache.get_json(cache_keys::GAMES_LAST_UPDATED).await?;
        Ok(CachedGames {
            games: games.unwrap_or_default(),
            last_updated,
        })
    }

    /// Cached schedule when one exists, otherwise (or when forced) a fresh
    /// ingestion run.
    pub async fn get_games(&self, force_refresh: bool) -> GamesView {
        if !force_refresh {
            match self.cached_games().await {
                Ok(cached) if !cached.games.is_empty() => {
                    return GamesView {
                        games: cached.games,
                        last_updated: cached.last_updated,
                        stale: false,
                    };
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "cached games unreadable; scraping"),
            }
        }
        let outcome = self.scrape_games().await;
        GamesView {
            games: outcome.data,
            last_updated: Some(Utc::now()),
            stale: outcome.stale,
        }
    }

    // ------------------------------------------------------------------
    // Rankings
    // ------------------------------------------------------------------

    /// Run a rankings ingestion. Both polls are written together or not
    /// at all.
    pub async fn scrape_rankings(&self) -> ScrapeOutcome<RankingsPayload> {
        tracing::info!("rankings scrape starting");
        match self.refresh_rankings().await {
            Ok(payload) => {
                tracing::info!(
                    mens = payload.mens.len(),
                    womens = payload.womens.len(),
                    "rankings scrape complete"
                );
                let updated_at = payload.updated_at;
                self.update_status(|status| {
                    status.rankings_last_run = Some(updated_at);
                    status.rankings_last_error = None;
                })
                .await;
                ScrapeOutcome::fresh(payload)
            }
            Err(e) => {
                tracing::error!(error = %e, "rankings scrape failed; serving cached snapshot");
                let cached = self.cached_rankings().await.unwrap_or_else(|read_err| {
                    tracing::warn!(error = %read_err, "cached rankings unreadable");
                    CachedRankings::default()
                });
                let message = e.to_string();
                self.update_status(|status| status.rankings_last_error = Some(message))
                    .await;
                ScrapeOutcome::stale(RankingsPayload {
                    mens: cached.mens,
                    womens: cached.womens,
                    updated_at: cached.last_updated.unwrap_or_else(Utc::now),
                })
            }
        }
    }

    async fn refresh_rankings(&self) -> Result<RankingsPayload, IngestError> {
        let rankings = &self.sources.rankings;
        let payload = self
            .retry
            .run("rankings", || rankings.fetch_rankings())
            .await?;

        self.write_rankings(&payload).await?;
        Ok(payload)
    }

    /// Writes the men's poll, then the women's poll, then `lastUpdated`. If
    /// a later write fails, the previous men's poll is put back so the two
    /// polls never come from different runs.
    async fn write_rankings(&self, payload: &RankingsPayload) -> Result<(), CacheError> {
        let ttl = Some(cache_keys::RANKINGS_TTL);
        let previous_mens = self.cache.get(cache_keys::RANKINGS_MENS).await?;
        self.cache
            .set_json(cache_keys::RANKINGS_MENS, &payload.mens, ttl)
            .await?;

        let remaining = async {
            self.cache
                .set_json(cache_keys::RANKINGS_WOMENS, &payload.womens, ttl)
                .await?;
            self.cache
                .set_json(cache_keys::RANKINGS_LAST_UPDATED, &payload.updated_at, ttl)
                .await
        };
        if let Err(e) = remaining.await {
            let restored = match &previous_mens {
                Some(value) => self.cache.set(cache_keys::RANKINGS_MENS, value, ttl).await,
                None => self.cache.delete(cache_keys::RANKINGS_MENS).await,
            };
            if let Err(restore_err) = restored {
                tracing::warn!(error = %restore_err, "failed to restore previous men's rankings");
            }
            return Err(e);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    pub async fn cached_rankings(&self) -> Result<CachedRankings, CacheError> {
        let mens = self.cache.get_json(cache_keys::RANKINGS_MENS).await?;
        let womens = self.cache.get_json(cache_keys::RANKINGS_WOMENS).await?;
        let last_updated = self
            .cache
            .get_json(cache_keys::RANKINGS_LAST_UPDATED)
            .await?;
        Ok(CachedRankings {
            mens: mens.unwrap_or_default(),
            womens: womens.unwrap_or_default(),
            last_updated,
        })
    }

    // ------------------------------------------------------------------
    // Game detail
    // ------------------------------------------------------------------

    /// Detail for one game, served from cache for 12 hours after the first
    /// fetch.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Scraper`] when the URL is refused or the page cannot
    ///   be fetched.
    /// - [`IngestError::Cache`] when the fresh detail cannot be stored.
    pub async fn game_detail(&self, detail_url: &str) -> Result<GameDetail, IngestError> {
        let url = self.sources.details.resolve(detail_url)?;
        let key = game_detail_key(&game_id_from_url(&url));

        match self.cache.get_json::<GameDetail>(&key).await {
            Ok(Some(detail)) => {
                tracing::debug!(key = %key, "game detail cache hit");
                return Ok(detail);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "cached game detail unreadable"),
        }

        let detail = self.sources.details.fetch_detail(&url).await?;
        self.cache
            .set_json(&key, &detail, Some(cache_keys::GAME_DETAIL_TTL))
            .await?;
        Ok(detail)
    }

    /// Previously cached detail for a game id, without fetching.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    pub async fn cached_game_detail(&self, game_id: &str) -> Result<Option<GameDetail>, CacheError> {
        self.cache.get_json(&game_detail_key(&safe_id(game_id))).await
    }

    // ------------------------------------------------------------------
    // Status and maintenance
    // ------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    pub async fn scrape_status(&self) -> Result<ScrapeStatus, CacheError> {
        Ok(self
            .cache
            .get_json(cache_keys::SCRAPE_STATUS)
            .await?
            .unwrap_or_default())
    }

    /// Record the next planned run times. `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the status record cannot be written.
    pub async fn record_next_runs(
        &self,
        games: Option<DateTime<Utc>>,
        rankings: Option<DateTime<Utc>>,
    ) -> Result<(), CacheError> {
        let mut status = self.scrape_status().await?;
        if games.is_some() {
            status.games_next_run = games;
        }
        if rankings.is_some() {
            status.rankings_next_run = rankings;
        }
        self.write_status(&status).await
    }

    /// Remove every ingestion key and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when a prefix cannot be cleared.
    pub async fn clear_cache(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for prefix in cache_keys::CLEARABLE_PREFIXES {
            removed += self.cache.clear_prefix(prefix).await?;
        }
        tracing::info!(removed, "cache cleared");
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend cannot be enumerated.
    pub async fn cache_status(&self) -> Result<CacheStatus, CacheError> {
        self.cache.status().await
    }

    async fn write_status(&self, status: &ScrapeStatus) -> Result<(), CacheError> {
        self.cache
            .set_json(
                cache_keys::SCRAPE_STATUS,
                status,
                Some(cache_keys::SCRAPE_STATUS_TTL),
            )
            .await
    }

    /// Read-modify-write of the status record. Failures are logged; status
    /// bookkeeping never changes a run's outcome.
    async fn update_status(&self, apply: impl FnOnce(&mut ScrapeStatus)) {
        let mut status = match self.scrape_status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "scrape status unreadable; starting fresh");
                ScrapeStatus::default()
            }
        };
        apply(&mut status);
        if let Err(e) = self.write_status(&status).await {
            tracing::warn!(error = %e, "failed to write scrape status");
        }
    }
}
