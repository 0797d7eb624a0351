//! Integration tests for `OddsEnricher::enrich` against a mocked odds API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use laxsched_core::{Game, LEAGUE_NAME};
use laxsched_scraper::{OddsEnricher, PageFetcher};

fn test_fetcher() -> PageFetcher {
    PageFetcher::new(5, "laxsched-test/0.1", 0, 0).expect("failed to build test PageFetcher")
}

fn kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 18, 17, 0, 0).unwrap()
}

fn game(id: &str, home: &str, away: &str) -> Game {
    Game {
        id: id.to_owned(),
        start_time: kickoff(),
        home_team: home.to_owned(),
        away_team: away.to_owned(),
        platforms: Vec::new(),
        detail_url: format!("https://www.livesportsontv.com/match/{id}"),
        league: LEAGUE_NAME.to_owned(),
        is_live: false,
        odds_available: false,
        odds: None,
        last_updated: kickoff(),
    }
}

fn event(home: &str, away: &str, commence: DateTime<Utc>) -> serde_json::Value {
    json!({
        "id": format!("{home}-{away}"),
        "home_team": home,
        "away_team": away,
        "commence_time": commence.to_rfc3339(),
        "bookmakers": [{
            "title": "DraftKings",
            "markets": [
                {"key": "h2h", "outcomes": [
                    {"name": home, "price": -200},
                    {"name": away, "price": 160}
                ]},
                {"key": "totals", "outcomes": [
                    {"name": "Over", "point": 22.5, "price": -115},
                    {"name": "Under", "point": 22.5, "price": -105}
                ]}
            ]
        }]
    })
}

async fn mount_sports(server: &MockServer, sports: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/sports/"))
        .and(query_param("apiKey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sports))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn matches_event_within_window_and_skips_distant_one() {
    let server = MockServer::start().await;
    mount_sports(
        &server,
        json!([
            {"key": "basketball_nba", "title": "NBA"},
            {"key": "lacrosse_ncaa", "title": "NCAA Lacrosse"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sports/lacrosse_ncaa/odds/"))
        .and(query_param("regions", "us"))
        .and(query_param("markets", "h2h,spreads,totals"))
        .and(query_param("oddsFormat", "american"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            event("Notre Dame", "Duke", kickoff() + Duration::minutes(30)),
            event("Navy", "Army", kickoff() + Duration::hours(13))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let enricher = OddsEnricher::new(test_fetcher(), Some("test-key".to_owned()), &server.uri());
    let odds = enricher
        .enrich(&[game("g1", "Notre Dame", "Duke"), game("g2", "Navy", "Army")])
        .await;

    assert_eq!(odds.len(), 1);
    let g1 = &odds["g1"];
    assert_eq!(g1.provider, "DraftKings");
    assert_eq!(g1.moneyline.as_deref(), Some("Notre Dame: -200 | Duke: 160"));
    assert_eq!(
        g1.over_under.as_deref(),
        Some("Over: 22.5 (-115) | Under: 22.5 (-105)")
    );
    assert!(g1.spread.is_none());
}

#[tokio::test]
async fn no_api_key_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let enricher = OddsEnricher::new(test_fetcher(), None, &server.uri());
    assert!(!enricher.is_enabled());
    assert!(enricher.enrich(&[game("g1", "A", "B")]).await.is_empty());
}

#[tokio::test]
async fn failing_sport_key_does_not_cancel_others() {
    let server = MockServer::start().await;
    mount_sports(
        &server,
        json!([
            {"key": "lacrosse_pll", "title": "PLL"},
            {"key": "lacrosse_ncaa", "title": "NCAA Lacrosse"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sports/lacrosse_pll/odds/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sports/lacrosse_ncaa/odds/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([event("Notre Dame", "Duke", kickoff())])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let enricher = OddsEnricher::new(test_fetcher(), Some("test-key".to_owned()), &server.uri());
    let odds = enricher.enrich(&[game("g1", "Notre Dame", "Duke")]).await;
    assert!(odds.contains_key("g1"));
}

#[tokio::test]
async fn discovery_failure_yields_no_odds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sports/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let enricher = OddsEnricher::new(test_fetcher(), Some("test-key".to_owned()), &server.uri());
    assert!(enricher.enrich(&[game("g1", "A", "B")]).await.is_empty());
}

#[tokio::test]
async fn at_most_three_sport_keys_are_queried() {
    let server = MockServer::start().await;
    mount_sports(
        &server,
        json!([
            {"key": "lacrosse_a", "title": "A"},
            {"key": "lacrosse_b", "title": "B"},
            {"key": "lacrosse_c", "title": "C"},
            {"key": "lacrosse_d", "title": "D"}
        ]),
    )
    .await;
    for key in ["lacrosse_a", "lacrosse_b", "lacrosse_c"] {
        Mock::given(method("GET"))
            .and(path(format!("/sports/{key}/odds/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/sports/lacrosse_d/odds/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let enricher = OddsEnricher::new(test_fetcher(), Some("test-key".to_owned()), &server.uri());
    assert!(enricher.enrich(&[game("g1", "A", "B")]).await.is_empty());
}
