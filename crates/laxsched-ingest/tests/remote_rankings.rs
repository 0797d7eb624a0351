//! Rankings persistence against the REST key/value backend.
//!
//! A `wiremock` server stands in for the remote service so individual cache
//! commands can be made to fail.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use laxsched_cache::{CacheStore, RemoteStore};
use laxsched_core::{Game, GameDetail, RankingEntry, RankingsPayload};
use laxsched_ingest::{
    DetailSource, NoOdds, RankingsSource, ScheduleSource, ScrapeCoordinator, Sources,
};
use laxsched_scraper::{RetryPolicy, ScraperError};

/// Matches a posted command array by verb and key.
struct Command(&'static str, &'static str);

impl Match for Command {
    fn matches(&self, request: &Request) -> bool {
        let Ok(Value::Array(parts)) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        parts.first().and_then(Value::as_str) == Some(self.0)
            && parts.get(1).and_then(Value::as_str) == Some(self.1)
    }
}

struct FixedRankings(RankingsPayload);

#[async_trait]
impl RankingsSource for FixedRankings {
    async fn fetch_rankings(&self) -> Result<RankingsPayload, ScraperError> {
        Ok(self.0.clone())
    }
}

struct Unused;

#[async_trait]
impl ScheduleSource for Unused {
    async fn fetch_games(&self) -> Result<Vec<Game>, ScraperError> {
        Err(ScraperError::ExtractionEmpty {
            context: "schedule".to_owned(),
        })
    }
}

#[async_trait]
impl DetailSource for Unused {
    fn resolve(&self, detail_url: &str) -> Result<String, ScraperError> {
        Ok(detail_url.to_owned())
    }

    async fn fetch_detail(&self, _url: &str) -> Result<GameDetail, ScraperError> {
        Err(ScraperError::ExtractionEmpty {
            context: "detail".to_owned(),
        })
    }
}

fn entry(rank: u32, team: &str) -> RankingEntry {
    RankingEntry {
        rank,
        team: team.to_owned(),
        record: "5-0".to_owned(),
        points_votes: "100".to_owned(),
        change: "0".to_owned(),
    }
}

fn coordinator(server: &MockServer) -> ScrapeCoordinator {
    let store = RemoteStore::new(&server.uri(), "test-token", 5).expect("build remote store");
    let sources = Sources {
        schedule: Arc::new(Unused),
        rankings: Arc::new(FixedRankings(RankingsPayload {
            mens: vec![entry(1, "Syracuse"), entry(2, "Duke")],
            womens: vec![entry(1, "Northwestern")],
            updated_at: Utc.with_ymd_and_hms(2026, 4, 14, 0, 0, 0).unwrap(),
        })),
        enricher: Arc::new(NoOdds),
        details: Arc::new(Unused),
    };
    ScrapeCoordinator::new(CacheStore::remote(store), sources).with_retry_policy(RetryPolicy {
        max_attempts: 1,
        base_delay_ms: 0,
    })
}

async fn mount_fallback(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
        .mount(server)
        .await;
}

async fn posted_commands(server: &MockServer, verb: &str, key: &str) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| serde_json::from_slice::<Vec<Value>>(&r.body).ok())
        .filter(|parts| parts[0] == verb && parts[1] == key)
        .collect()
}

#[tokio::test]
async fn failed_womens_write_restores_previous_mens_poll() {
    let server = MockServer::start().await;
    let previous = vec![entry(1, "Maryland")];
    let previous_text = serde_json::to_string(&previous).unwrap();

    Mock::given(method("POST"))
        .and(Command("GET", "rankings:mens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": previous_text})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(Command("SET", "rankings:womens"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(Command("SET", "rankings:mens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(2)
        .mount(&server)
        .await;
    mount_fallback(&server).await;

    let outcome = coordinator(&server).scrape_rankings().await;
    assert!(outcome.stale);
    assert_eq!(outcome.data.mens, previous);

    let writes = posted_commands(&server, "SET", "rankings:mens").await;
    assert_eq!(writes.len(), 2);
    let fresh: Value = serde_json::from_str(writes[0][2].as_str().unwrap()).unwrap();
    assert_eq!(fresh[0]["team"], "Syracuse");
    let restored: Value = serde_json::from_str(writes[1][2].as_str().unwrap()).unwrap();
    assert_eq!(restored, serde_json::to_value(&previous).unwrap());
    assert!(posted_commands(&server, "SET", "rankings:lastUpdated")
        .await
        .is_empty());
}

#[tokio::test]
async fn failed_womens_write_without_previous_poll_deletes_mens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(Command("SET", "rankings:womens"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(Command("DEL", "rankings:mens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;
    mount_fallback(&server).await;

    let outcome = coordinator(&server).scrape_rankings().await;
    assert!(outcome.stale);
    assert!(outcome.data.mens.is_empty());
    assert_eq!(posted_commands(&server, "SET", "rankings:mens").await.len(), 1);
}

#[tokio::test]
async fn successful_run_writes_both_polls_before_timestamp() {
    let server = MockServer::start().await;
    mount_fallback(&server).await;

    let outcome = coordinator(&server).scrape_rankings().await;
    assert!(!outcome.stale);

    let keys: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| serde_json::from_slice::<Vec<Value>>(&r.body).ok())
        .filter(|parts| parts[0] == "SET")
        .filter_map(|parts| parts[1].as_str().map(str::to_owned))
        .filter(|key| key.starts_with("rankings:"))
        .collect();
    assert_eq!(
        keys,
        ["rankings:mens", "rankings:womens", "rankings:lastUpdated"]
    );
}
