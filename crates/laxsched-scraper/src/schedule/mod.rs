//! Schedule page extraction.

mod fixture;
mod payload;

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use laxsched_core::{AppConfig, Game};

use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::policy::PolicyGate;

pub use fixture::game_id_from_url;

/// Fixtures that started longer ago than this are dropped as finished.
const FINISHED_AFTER_HOURS: i64 = 3;

/// Pure transformation of a schedule page into games: locate embedded
/// payloads, pick the richest fixture list, normalize, drop finished games,
/// deduplicate by id and sort by start time.
#[must_use]
pub fn parse_schedule(html: &str, page_url: &str, now: DateTime<Utc>) -> Vec<Game> {
    let payloads = payload::candidate_payloads(html);
    let fixtures = payload::best_fixture_array(&payloads);
    tracing::debug!(
        payloads = payloads.len(),
        fixtures = fixtures.len(),
        "schedule payload scan complete"
    );

    let cutoff = now - Duration::hours(FINISHED_AFTER_HOURS);
    let mut seen = HashSet::new();
    let mut games: Vec<Game> = fixtures
        .into_iter()
        .filter_map(|raw| fixture::fixture_to_game(raw, page_url, now))
        .filter(|game| game.start_time >= cutoff)
        .filter(|game| seen.insert(game.id.clone()))
        .collect();
    games.sort_by_key(|game| game.start_time);
    games
}

/// Fetches and parses the configured schedule page.
#[derive(Debug, Clone)]
pub struct ScheduleExtractor {
    fetcher: PageFetcher,
    policy: PolicyGate,
    schedule_url: String,
}

impl ScheduleExtractor {
    #[must_use]
    pub fn new(fetcher: PageFetcher, policy: PolicyGate, schedule_url: &str) -> Self {
        Self {
            fetcher,
            policy,
            schedule_url: schedule_url.to_owned(),
        }
    }

    #[must_use]
    pub fn from_config(fetcher: PageFetcher, policy: PolicyGate, config: &AppConfig) -> Self {
        Self::new(fetcher, policy, &config.schedule_url)
    }

    #[must_use]
    pub fn schedule_url(&self) -> &str {
        &self.schedule_url
    }

    /// # Errors
    ///
    /// - [`ScraperError::PolicyDenied`] before any page fetch when robots.txt
    ///   forbids the schedule page.
    /// - Fetch errors from [`PageFetcher::fetch_html`].
    /// - [`ScraperError::ExtractionEmpty`] when no payload yields a fixture.
    pub async fn extract(&self) -> Result<Vec<Game>, ScraperError> {
        self.policy.ensure_allowed(&self.schedule_url).await?;
        let html = self.fetcher.fetch_html(&self.schedule_url).await?;
        let games = parse_schedule(&html, &self.schedule_url, Utc::now());
        if games.is_empty() {
            return Err(ScraperError::ExtractionEmpty {
                context: self.schedule_url.clone(),
            });
        }
        tracing::info!(url = %self.schedule_url, count = games.len(), "extracted schedule");
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const PAGE: &str = "https://www.livesportsontv.com/league/college-lacrosse";

    fn next_data_page(events: &serde_json::Value) -> String {
        format!(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
            json!({"props": {"pageProps": {"events": events}}})
        )
    }

    #[test]
    fn drops_finished_dedups_and_sorts() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let html = next_data_page(&json!([
            {"slug": "late", "id": 3, "startTime": "2026-03-14T20:00:00Z", "title": "C vs D"},
            {"slug": "early", "id": 2, "startTime": "2026-03-14T10:00:00Z", "title": "A vs B"},
            {"slug": "finished", "id": 1, "startTime": "2026-03-14T08:59:00Z", "title": "E vs F"},
            {"slug": "late", "id": 3, "startTime": "2026-03-14T20:00:00Z", "title": "C vs D again"}
        ]));

        let games = parse_schedule(&html, PAGE, now);
        let ids: Vec<&str> = games.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["early-2", "late-3"]);
        assert_eq!(games[1].away_team, "C");
    }

    #[test]
    fn exactly_three_hours_ago_is_kept() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let html = next_data_page(&json!([
            {"slug": "edge", "startTime": "2026-03-14T09:00:00Z", "title": "A vs B"}
        ]));
        assert_eq!(parse_schedule(&html, PAGE, now).len(), 1);
    }

    #[test]
    fn page_without_payload_yields_nothing() {
        let now = Utc::now();
        assert!(parse_schedule("<html><body>No games</body></html>", PAGE, now).is_empty());
    }

    #[test]
    fn renormalizing_yields_identical_ids() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let html = next_data_page(&json!([
            {"slug": "duke-vs-unc", "id": 9, "startTime": "2026-03-14T17:00:00Z", "title": "Duke vs UNC"}
        ]));
        let first = parse_schedule(&html, PAGE, now);
        let second = parse_schedule(&html, PAGE, now);
        assert_eq!(first[0].id, second[0].id);
    }
}
