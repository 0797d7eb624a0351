//! Mapping one raw fixture object to a [`Game`].
//!
//! Source payloads name the same field several ways; each lookup below
//! tries its synonyms in order and takes the first non-empty value.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::Url;
use serde_json::{Map, Value};

use laxsched_core::{Game, PlatformSlug, StreamingPlatform, LEAGUE_NAME};

use crate::text::{
    detect_platform, extract_affiliate_target, is_likely_match_url, normalize_whitespace,
    parse_teams, safe_id, to_absolute_url,
};

const SLUG_KEYS: [&str; 3] = ["slug", "url", "href"];
const ID_KEYS: [&str; 3] = ["id", "eventId", "event_id"];
const START_KEYS: [&str; 6] = ["startTime", "start_time", "date", "datetime", "startDate", "start"];
const HOME_KEYS: [&str; 3] = ["homeTeam", "home_team", "home"];
const AWAY_KEYS: [&str; 3] = ["awayTeam", "away_team", "away"];
const TITLE_KEYS: [&str; 2] = ["title", "name"];
const CHANNEL_KEYS: [&str; 3] = ["channels", "broadcasts", "tv"];
const DEEP_LINK_KEYS: [&str; 4] = ["deeplinks", "deepLinks", "deep_links", "links"];
const LINK_NAME_KEYS: [&str; 4] = ["name", "channel", "title", "label"];
const LINK_URL_KEYS: [&str; 3] = ["url", "href", "link"];

/// Start time used when the fixture's own timestamp is unusable.
const FALLBACK_START_OFFSET_HOURS: i64 = 6;

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn first_array<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// A team is either a bare string or an object with a `name`.
fn team_name(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = first_value(obj, keys)?;
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(team) => first_str(team, &["name", "displayName", "shortName", "title"])?,
        _ => return None,
    };
    let name = normalize_whitespace(raw);
    (!name.is_empty()).then_some(name)
}

fn has_slug(obj: &Map<String, Value>) -> bool {
    first_str(obj, &["slug"]).is_some()
        || first_str(obj, &["url", "href"]).is_some_and(is_likely_match_url)
}

/// Has a slug or match URL, a start time, and teams (explicit or a title).
pub(crate) fn is_fixture_shaped(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let has_start = first_value(obj, &START_KEYS).is_some_and(|v| v.is_string() || v.is_number());
    let has_teams = (team_name(obj, &HOME_KEYS).is_some() && team_name(obj, &AWAY_KEYS).is_some())
        || first_str(obj, &TITLE_KEYS).is_some();
    has_slug(obj) && has_start && has_teams
}

fn numeric_id(obj: &Map<String, Value>) -> Option<String> {
    let value = first_value(obj, &ID_KEYS)?;
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        _ => None,
    }
}

/// Canonical detail page: the fixture's own match URL when present,
/// otherwise `<base>/match/<slug>-<id>`.
fn detail_url(obj: &Map<String, Value>, base_url: &str) -> Option<String> {
    for key in SLUG_KEYS {
        if let Some(candidate) = first_str(obj, &[key]) {
            if is_likely_match_url(candidate) {
                return Some(to_absolute_url(candidate, base_url));
            }
        }
    }
    let slug = first_str(obj, &["slug"])?.trim_matches('/');
    let path = match numeric_id(obj) {
        Some(id) if !slug.ends_with(&format!("-{id}")) => format!("/match/{slug}-{id}"),
        _ => format!("/match/{slug}"),
    };
    Some(to_absolute_url(&path, base_url))
}

/// Game id: slugified last path segment of the detail URL.
#[must_use]
pub fn game_id_from_url(detail_url: &str) -> String {
    let segment = Url::parse(detail_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_owned))
        })
        .unwrap_or_else(|| detail_url.to_owned());
    safe_id(&segment)
}

fn parse_start(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // Millisecond epochs are 13 digits for any date this side of 2286.
            if raw.abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

struct RawLink {
    name: String,
    url: Option<String>,
}

fn raw_link(value: &Value) -> Option<RawLink> {
    match value {
        Value::String(s) => {
            let name = normalize_whitespace(s);
            (!name.is_empty()).then_some(RawLink { name, url: None })
        }
        Value::Object(obj) => {
            let name = match first_value(obj, &LINK_NAME_KEYS)? {
                Value::String(s) => normalize_whitespace(s),
                Value::Object(inner) => normalize_whitespace(first_str(inner, &["name", "title"])?),
                _ => return None,
            };
            let url = first_str(obj, &LINK_URL_KEYS)
                .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
                .map(str::to_owned);
            (!name.is_empty()).then_some(RawLink { name, url })
        }
        _ => None,
    }
}

fn same_platform(a: &StreamingPlatform, link_name: &str) -> bool {
    let other = detect_platform(link_name, "");
    if a.slug == PlatformSlug::Other {
        other.slug == a.slug && other.name.eq_ignore_ascii_case(&a.name)
    } else {
        other.slug == a.slug
    }
}

/// Watch options: one per channel, then any deep link whose platform no
/// channel covered. Affiliate target preference: the platform's deep link,
/// the channel's own URL, then the detail page.
fn platforms(obj: &Map<String, Value>, detail_url: &str) -> Vec<StreamingPlatform> {
    let channels: Vec<RawLink> = first_array(obj, &CHANNEL_KEYS).iter().filter_map(raw_link).collect();
    let deep_links: Vec<RawLink> = first_array(obj, &DEEP_LINK_KEYS)
        .iter()
        .filter_map(raw_link)
        .filter(|l| l.url.is_some())
        .collect();

    let mut out: Vec<StreamingPlatform> = Vec::new();
    let mut push = |platform: StreamingPlatform| {
        let duplicate = out
            .iter()
            .any(|p| p.slug == platform.slug && p.affiliate_url == platform.affiliate_url);
        if !duplicate {
            out.push(platform);
        }
    };

    let mut used_links = vec![false; deep_links.len()];
    for channel in &channels {
        let mut platform = detect_platform(&channel.name, detail_url);
        let deep = deep_links
            .iter()
            .enumerate()
            .find(|(_, link)| same_platform(&platform, &link.name));
        let target = match (deep, channel.url.as_deref()) {
            (Some((i, link)), _) => {
                used_links[i] = true;
                link.url.clone()
            }
            (None, Some(url)) => Some(url.to_owned()),
            (None, None) => None,
        };
        if let Some(target) = target {
            platform.affiliate_url = extract_affiliate_target(&target);
        }
        push(platform);
    }
    for (link, used) in deep_links.iter().zip(used_links) {
        if used {
            continue;
        }
        if let Some(url) = &link.url {
            push(detect_platform(&link.name, &extract_affiliate_target(url)));
        }
    }
    out
}

/// Map a fixture-shaped object to a [`Game`]. Returns `None` when no detail
/// URL can be derived.
pub(crate) fn fixture_to_game(value: &Value, base_url: &str, now: DateTime<Utc>) -> Option<Game> {
    let obj = value.as_object()?;
    let detail_url = detail_url(obj, base_url)?;
    let id = game_id_from_url(&detail_url);
    if id.is_empty() {
        return None;
    }

    let start_time = parse_start(first_value(obj, &START_KEYS))
        .unwrap_or_else(|| now + Duration::hours(FALLBACK_START_OFFSET_HOURS));

    let (home_team, away_team) = match (team_name(obj, &HOME_KEYS), team_name(obj, &AWAY_KEYS)) {
        (Some(home), Some(away)) => (home, away),
        _ => {
            let teams = parse_teams(first_str(obj, &TITLE_KEYS).unwrap_or_default());
            (teams.home, teams.away)
        }
    };

    Some(Game {
        id,
        start_time,
        home_team,
        away_team,
        platforms: platforms(obj, &detail_url),
        detail_url,
        league: LEAGUE_NAME.to_owned(),
        is_live: false,
        odds_available: false,
        odds: None,
        last_updated: now,
    })
}

#[cfg(test)]
#[path = "fixture_test.rs"]
mod tests;
