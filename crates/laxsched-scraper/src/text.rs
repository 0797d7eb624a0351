//! String normalization shared by the extractors.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use laxsched_core::{PlatformSlug, StreamingPlatform};

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static UNSAFE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("valid regex"));

const MAX_ID_LEN: usize = 80;

/// Query parameters that redirect wrappers use to carry the real target.
const REDIRECT_QUERY_KEYS: [&str; 9] = [
    "url",
    "redirect",
    "target",
    "dest",
    "destination",
    "u",
    "to",
    "r",
    "ref",
];

/// Separators between the two teams of a matchup title. The left side is the
/// visiting team.
const MATCHUP_SEPARATORS: [&str; 5] = [" - ", " vs ", " vs. ", " @ ", " at "];

struct PlatformPattern {
    pattern: Regex,
    slug: PlatformSlug,
    logo: &'static str,
    display_name: &'static str,
}

/// Ordered; the first pattern that matches wins, so the specific ESPN tiers
/// precede the generic `espn` entry.
static PLATFORM_PATTERNS: LazyLock<Vec<PlatformPattern>> = LazyLock::new(|| {
    let entry = |pattern: &str,
                 slug: PlatformSlug,
                 logo: &'static str,
                 display_name: &'static str| PlatformPattern {
        pattern: Regex::new(pattern).expect("valid platform regex"),
        slug,
        logo,
        display_name,
    };
    vec![
        entry(r"(?i)fubo", PlatformSlug::Fubo, "/platform-logos/fubo.svg", "Fubo Sports"),
        entry(
            r"(?i)espn\s*select",
            PlatformSlug::EspnSelect,
            "/platform-logos/espn.svg",
            "ESPN Select",
        ),
        entry(
            r"(?i)espn\s*unlimited",
            PlatformSlug::EspnUnlimited,
            "/platform-logos/espn.svg",
            "ESPN Unlimited",
        ),
        entry(r"(?i)espn", PlatformSlug::EspnPlus, "/platform-logos/espn.svg", "ESPN+"),
        entry(
            r"(?i)paramount",
            PlatformSlug::ParamountPlus,
            "/platform-logos/paramount.svg",
            "Paramount+",
        ),
        entry(r"(?i)nbc", PlatformSlug::NbcSports, "/platform-logos/nbc.svg", "NBC Sports"),
        entry(r"(?i)fox", PlatformSlug::FoxSports, "/platform-logos/fox.svg", "Fox Sports"),
        entry(
            r"(?i)youtube\s*tv",
            PlatformSlug::YoutubeTv,
            "/platform-logos/youtube-tv.svg",
            "YouTube TV",
        ),
        entry(r"(?i)hulu", PlatformSlug::HuluLive, "/platform-logos/hulu.svg", "Hulu + Live TV"),
    ]
});

const DEFAULT_LOGO: &str = "/platform-logos/default.svg";
const DEFAULT_PLATFORM_NAME: &str = "Streaming Platform";

/// Collapse runs of whitespace to one space and trim.
#[must_use]
pub fn normalize_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_owned()
}

/// Lowercase, replace runs of characters outside `[a-z0-9-]` with `-`,
/// trim leading/trailing `-`, and cap at 80 characters.
#[must_use]
pub fn safe_id(value: &str) -> String {
    let lowered = value.to_lowercase();
    let replaced = UNSAFE_ID_RE.replace_all(&lowered, "-");
    // Only ASCII remains, so byte truncation is safe.
    let trimmed = replaced.trim_matches('-');
    trimmed[..trimmed.len().min(MAX_ID_LEN)].to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teams {
    pub home: String,
    pub away: String,
}

/// Split a matchup title into teams. Titles without a recognised separator
/// become `TBD` at the title.
#[must_use]
pub fn parse_teams(matchup: &str) -> Teams {
    let normalized = normalize_whitespace(matchup);
    // ASCII-only lowering keeps byte offsets aligned with `normalized`.
    let lowered = normalized.to_ascii_lowercase();

    for separator in MATCHUP_SEPARATORS {
        let Some(pos) = lowered.find(separator) else {
            continue;
        };
        let (Some(left), Some(right)) = (
            normalized.get(..pos),
            normalized.get(pos + separator.len()..),
        ) else {
            continue;
        };
        let (away, home) = (normalize_whitespace(left), normalize_whitespace(right));
        if !away.is_empty() && !home.is_empty() {
            return Teams { home, away };
        }
    }

    Teams {
        home: if normalized.is_empty() {
            "TBD".to_owned()
        } else {
            normalized
        },
        away: "TBD".to_owned(),
    }
}

/// Map a raw channel label to a platform record pointing at `affiliate_url`.
#[must_use]
pub fn detect_platform(raw_name: &str, affiliate_url: &str) -> StreamingPlatform {
    let normalized = normalize_whitespace(raw_name);
    if let Some(known) = PLATFORM_PATTERNS
        .iter()
        .find(|p| p.pattern.is_match(&normalized))
    {
        return StreamingPlatform {
            name: known.display_name.to_owned(),
            slug: known.slug,
            logo: known.logo.to_owned(),
            affiliate_url: affiliate_url.to_owned(),
        };
    }
    StreamingPlatform {
        name: if normalized.is_empty() {
            DEFAULT_PLATFORM_NAME.to_owned()
        } else {
            normalized
        },
        slug: PlatformSlug::Other,
        logo: DEFAULT_LOGO.to_owned(),
        affiliate_url: affiliate_url.to_owned(),
    }
}

/// Unwrap a redirect wrapper: the first redirect-style query parameter that
/// holds an absolute http(s) URL, else `url` unchanged.
#[must_use]
pub fn extract_affiliate_target(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_owned();
    };
    for key in REDIRECT_QUERY_KEYS {
        let target = parsed
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned());
        if let Some(target) = target {
            let lowered = target.to_ascii_lowercase();
            if lowered.starts_with("http://") || lowered.starts_with("https://") {
                return target;
            }
        }
    }
    url.to_owned()
}

/// Resolve `input` against `base`. Empty or unresolvable input yields `base`.
#[must_use]
pub fn to_absolute_url(input: &str, base: &str) -> String {
    if input.is_empty() {
        return base.to_owned();
    }
    Url::parse(base)
        .and_then(|b| b.join(input))
        .map_or_else(|_| base.to_owned(), |u| u.to_string())
}

#[must_use]
pub fn is_likely_match_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("/match/")
}

#[cfg(test)]
#[path = "text_test.rs"]
mod tests;
