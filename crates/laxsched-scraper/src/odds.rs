//! Best-effort betting-line enrichment from The Odds API.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;

use laxsched_core::{AppConfig, Game, GameOdds};

use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::text::normalize_whitespace;

/// Sport keys queried per run.
const MAX_SPORT_KEYS: usize = 3;
/// Odds requests in flight at once.
const ODDS_CONCURRENCY: usize = 2;
/// An event further than this from a game's start is a different game.
const MATCH_WINDOW_HOURS: i64 = 12;

#[derive(Debug, Clone, Deserialize)]
struct Sport {
    key: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    pub title: String,
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub price: Option<f64>,
    pub point: Option<f64>,
}

fn normalize_team_name(team: &str) -> String {
    normalize_whitespace(team)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Same home and away teams after normalization, and a commence time
/// strictly within 12 hours of the game's start.
#[must_use]
pub fn event_matches_game(event: &OddsEvent, game: &Game) -> bool {
    normalize_team_name(&event.home_team) == normalize_team_name(&game.home_team)
        && normalize_team_name(&event.away_team) == normalize_team_name(&game.away_team)
        && (event.commence_time - game.start_time).abs() < Duration::hours(MATCH_WINDOW_HOURS)
}

fn number_or_missing(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_owned(), |n| n.to_string())
}

fn format_market(market: Option<&Market>, with_point: bool) -> Option<String> {
    market.map(|m| {
        m.outcomes
            .iter()
            .map(|o| {
                if with_point {
                    format!(
                        "{}: {} ({})",
                        o.name,
                        number_or_missing(o.point),
                        number_or_missing(o.price)
                    )
                } else {
                    format!("{}: {}", o.name, number_or_missing(o.price))
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    })
}

/// Lines from the event's first bookmaker. `None` when it lists none.
#[must_use]
pub fn odds_from_event(event: &OddsEvent, now: DateTime<Utc>) -> Option<GameOdds> {
    let bookmaker = event.bookmakers.first()?;
    let market = |key: &str| bookmaker.markets.iter().find(|m| m.key == key);
    Some(GameOdds {
        provider: bookmaker.title.clone(),
        moneyline: format_market(market("h2h"), false),
        spread: format_market(market("spreads"), true),
        over_under: format_market(market("totals"), true),
        updated_at: now,
    })
}

/// Looks up odds for scraped games. Never fails: any provider problem
/// leaves the affected games without odds.
#[derive(Debug, Clone)]
pub struct OddsEnricher {
    fetcher: PageFetcher,
    api_key: Option<String>,
    base_url: String,
}

impl OddsEnricher {
    /// A `None` key disables enrichment.
    #[must_use]
    pub fn new(fetcher: PageFetcher, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            fetcher,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn from_config(fetcher: PageFetcher, config: &AppConfig) -> Self {
        Self::new(fetcher, config.odds_api_key.clone(), &config.odds_base_url)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn discover_sport_keys(&self, api_key: &str) -> Result<Vec<String>, ScraperError> {
        let url = format!("{}/sports/", self.base_url);
        let sports: Vec<Sport> = self.fetcher.fetch_json(&url, &[("apiKey", api_key)]).await?;
        Ok(sports
            .into_iter()
            .filter(|s| {
                s.key.to_lowercase().contains("lacrosse")
                    || s.title.to_lowercase().contains("lacrosse")
            })
            .map(|s| s.key)
            .take(MAX_SPORT_KEYS)
            .collect())
    }

    async fn fetch_events(&self, api_key: &str, sport_key: &str) -> Result<Vec<OddsEvent>, ScraperError> {
        let url = format!("{}/sports/{sport_key}/odds/", self.base_url);
        self.fetcher
            .fetch_json(
                &url,
                &[
                    ("apiKey", api_key),
                    ("regions", "us"),
                    ("markets", "h2h,spreads,totals"),
                    ("oddsFormat", "american"),
                ],
            )
            .await
    }

    /// Odds keyed by game id, for the games a provider event matched.
    pub async fn enrich(&self, games: &[Game]) -> HashMap<String, GameOdds> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("odds enrichment disabled: no API key");
            return HashMap::new();
        };
        if games.is_empty() {
            return HashMap::new();
        }

        let sport_keys = match self.discover_sport_keys(api_key).await {
            Ok(keys) if !keys.is_empty() => keys,
            Ok(_) => {
                tracing::info!("odds provider lists no lacrosse sports");
                return HashMap::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "odds sport discovery failed");
                return HashMap::new();
            }
        };

        let events: Vec<OddsEvent> = stream::iter(sport_keys)
            .map(|sport_key| async move {
                match self.fetch_events(api_key, &sport_key).await {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!(sport_key = %sport_key, error = %e, "odds fetch failed");
                        Vec::new()
                    }
                }
            })
            .buffered(ODDS_CONCURRENCY)
            .concat()
            .await;

        let now = Utc::now();
        let odds: HashMap<String, GameOdds> = games
            .iter()
            .filter_map(|game| {
                let event = events.iter().find(|e| event_matches_game(e, game))?;
                Some((game.id.clone(), odds_from_event(event, now)?))
            })
            .collect();
        tracing::info!(
            events = events.len(),
            matched = odds.len(),
            "odds enrichment complete"
        );
        odds
    }
}
