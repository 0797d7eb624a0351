use super::*;
use chrono::TimeZone;
use serde_json::json;

const BASE: &str = "https://www.livesportsontv.com/league/college-lacrosse";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

#[test]
fn fixture_shape_requires_slug_start_and_teams() {
    assert!(is_fixture_shaped(&json!({
        "slug": "duke-vs-notre-dame",
        "startTime": "2026-03-14T17:00:00Z",
        "title": "Duke vs Notre Dame"
    })));
    assert!(is_fixture_shaped(&json!({
        "url": "/match/army-vs-navy-9",
        "date": 1_773_507_600,
        "homeTeam": {"name": "Navy"},
        "awayTeam": "Army"
    })));
    assert!(!is_fixture_shaped(&json!({
        "slug": "missing-start",
        "title": "Duke vs Notre Dame"
    })));
    assert!(!is_fixture_shaped(&json!({
        "url": "/league/not-a-match",
        "startTime": "2026-03-14T17:00:00Z",
        "title": "Duke vs Notre Dame"
    })));
    assert!(!is_fixture_shaped(&json!(["not", "an", "object"])));
}

#[test]
fn builds_detail_url_from_slug_and_id() {
    let game = fixture_to_game(
        &json!({
            "slug": "duke-vs-notre-dame",
            "eventId": 884_213,
            "startTime": "2026-03-14T17:00:00Z",
            "title": "Duke vs Notre Dame"
        }),
        BASE,
        now(),
    )
    .unwrap();
    assert_eq!(
        game.detail_url,
        "https://www.livesportsontv.com/match/duke-vs-notre-dame-884213"
    );
    assert_eq!(game.id, "duke-vs-notre-dame-884213");
    assert_eq!(game.away_team, "Duke");
    assert_eq!(game.home_team, "Notre Dame");
    assert_eq!(game.league, "College Lacrosse");
}

#[test]
fn slug_already_ending_in_id_is_not_doubled() {
    let game = fixture_to_game(
        &json!({
            "slug": "duke-vs-notre-dame-77",
            "id": 77,
            "startTime": "2026-03-14T17:00:00Z",
            "title": "Duke vs Notre Dame"
        }),
        BASE,
        now(),
    )
    .unwrap();
    assert_eq!(game.id, "duke-vs-notre-dame-77");
}

#[test]
fn id_depends_only_on_detail_url() {
    let a = fixture_to_game(
        &json!({
            "url": "/match/syracuse-vs-maryland-12",
            "startTime": "2026-03-14T17:00:00Z",
            "title": "Syracuse vs Maryland"
        }),
        BASE,
        now(),
    )
    .unwrap();
    let b = fixture_to_game(
        &json!({
            "url": "https://www.livesportsontv.com/match/syracuse-vs-maryland-12",
            "startTime": "2026-03-14T18:00:00Z",
            "title": "Orange @ Terrapins (rescheduled)"
        }),
        BASE,
        now(),
    )
    .unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(game_id_from_url(&a.detail_url), a.id);
}

#[test]
fn explicit_team_fields_win_over_title() {
    let game = fixture_to_game(
        &json!({
            "slug": "x",
            "startTime": "2026-03-14T17:00:00Z",
            "title": "Something vs Else",
            "home_team": {"name": "Johns Hopkins"},
            "away_team": "Loyola"
        }),
        BASE,
        now(),
    )
    .unwrap();
    assert_eq!(game.home_team, "Johns Hopkins");
    assert_eq!(game.away_team, "Loyola");
}

#[test]
fn unparsable_start_falls_back_to_six_hours_ahead() {
    let game = fixture_to_game(
        &json!({"slug": "x", "startTime": "Saturday afternoon", "title": "A vs B"}),
        BASE,
        now(),
    )
    .unwrap();
    assert_eq!(game.start_time, now() + Duration::hours(6));
}

#[test]
fn parses_epoch_seconds_and_millis() {
    let expected = Utc.with_ymd_and_hms(2026, 3, 14, 17, 0, 0).unwrap();
    let secs = expected.timestamp();
    assert_eq!(parse_start(Some(&json!(secs))), Some(expected));
    assert_eq!(parse_start(Some(&json!(secs * 1000))), Some(expected));
    assert_eq!(
        parse_start(Some(&json!("2026-03-14T17:00:00"))),
        Some(expected)
    );
}

#[test]
fn deep_link_preferred_over_channel_url_over_detail_page() {
    let game = fixture_to_game(
        &json!({
            "slug": "duke-vs-unc",
            "id": 5,
            "startTime": "2026-03-14T17:00:00Z",
            "title": "Duke vs UNC",
            "channels": [
                {"name": "ESPN+", "url": "https://www.espn.com/watch/"},
                {"name": "ACC Network Extra", "url": "https://acc.example.com/live"},
                "Fubo"
            ],
            "deeplinks": [
                {"channel": "ESPN+", "url": "https://go.example.com/r?url=https%3A%2F%2Fplus.espn.com%2Fgame%2F5"}
            ]
        }),
        BASE,
        now(),
    )
    .unwrap();

    assert_eq!(game.platforms.len(), 3);
    assert_eq!(game.platforms[0].slug, PlatformSlug::EspnPlus);
    assert_eq!(game.platforms[0].affiliate_url, "https://plus.espn.com/game/5");
    assert_eq!(game.platforms[1].slug, PlatformSlug::Other);
    assert_eq!(game.platforms[1].name, "ACC Network Extra");
    assert_eq!(game.platforms[1].affiliate_url, "https://acc.example.com/live");
    assert_eq!(game.platforms[2].slug, PlatformSlug::Fubo);
    assert_eq!(game.platforms[2].affiliate_url, game.detail_url);
}

#[test]
fn platforms_are_deduplicated_by_slug_and_target() {
    let game = fixture_to_game(
        &json!({
            "slug": "a-vs-b",
            "startTime": "2026-03-14T17:00:00Z",
            "title": "A vs B",
            "broadcasts": ["ESPN+", "espn+", "ESPN Select"]
        }),
        BASE,
        now(),
    )
    .unwrap();
    let slugs: Vec<PlatformSlug> = game.platforms.iter().map(|p| p.slug).collect();
    assert_eq!(slugs, vec![PlatformSlug::EspnPlus, PlatformSlug::EspnSelect]);
}

#[test]
fn unmatched_deep_links_become_extra_platforms() {
    let game = fixture_to_game(
        &json!({
            "slug": "a-vs-b",
            "startTime": "2026-03-14T17:00:00Z",
            "title": "A vs B",
            "deepLinks": [{"name": "Paramount+", "href": "https://www.paramountplus.com/live"}]
        }),
        BASE,
        now(),
    )
    .unwrap();
    assert_eq!(game.platforms.len(), 1);
    assert_eq!(game.platforms[0].slug, PlatformSlug::ParamountPlus);
    assert_eq!(game.platforms[0].affiliate_url, "https://www.paramountplus.com/live");
}
