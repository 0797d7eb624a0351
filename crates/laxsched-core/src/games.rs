//! Schedule domain types.
//!
//! Every type here is a detached, serializable snapshot: extractors build
//! them from fetched pages and hand them to the coordinator, which decides
//! whether they are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LEAGUE_NAME: &str = "College Lacrosse";

/// Known streaming platforms. Anything unrecognised is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformSlug {
    Fubo,
    EspnPlus,
    EspnSelect,
    EspnUnlimited,
    ParamountPlus,
    NbcSports,
    FoxSports,
    YoutubeTv,
    HuluLive,
    Other,
}

impl PlatformSlug {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fubo => "fubo",
            Self::EspnPlus => "espn-plus",
            Self::EspnSelect => "espn-select",
            Self::EspnUnlimited => "espn-unlimited",
            Self::ParamountPlus => "paramount-plus",
            Self::NbcSports => "nbc-sports",
            Self::FoxSports => "fox-sports",
            Self::YoutubeTv => "youtube-tv",
            Self::HuluLive => "hulu-live",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PlatformSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingPlatform {
    pub name: String,
    pub slug: PlatformSlug,
    pub logo: String,
    pub affiliate_url: String,
}

/// Betting lines from the first bookmaker of a matched odds event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOdds {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moneyline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_under: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Slug of the canonical detail URL's last path segment.
    pub id: String,
    #[serde(rename = "startTimeISO")]
    pub start_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub platforms: Vec<StreamingPlatform>,
    pub detail_url: String,
    pub league: String,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub odds_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<GameOdds>,
    pub last_updated: DateTime<Utc>,
}

impl Game {
    /// A game counts as live for two hours after its start.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time && now - self.start_time < chrono::Duration::hours(2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetail {
    pub game_id: String,
    pub matchup: String,
    pub description: String,
    pub watch_options: Vec<StreamingPlatform>,
    pub detail_url: String,
    pub scraped_at: DateTime<Utc>,
}
