//! Fixed cache key namespace and per-key TTLs shared with the front end.

use std::time::Duration;

pub const GAMES: &str = "games:schedule";
pub const GAMES_LAST_UPDATED: &str = "games:lastUpdated";
pub const GAME_DETAIL_PREFIX: &str = "games:detail:";
pub const RANKINGS_MENS: &str = "rankings:mens";
pub const RANKINGS_WOMENS: &str = "rankings:womens";
pub const RANKINGS_LAST_UPDATED: &str = "rankings:lastUpdated";
pub const SCRAPE_STATUS: &str = "scrape:status";

/// Reserved for click analytics, which is recorded outside the ingestion core.
pub const CLICK_PREFIX: &str = "clicks:";

/// Prefixes removed by an administrative cache clear.
pub const CLEARABLE_PREFIXES: [&str; 4] = ["games:", "rankings:", "scrape:", GAME_DETAIL_PREFIX];

pub const GAMES_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const GAME_DETAIL_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const RANKINGS_TTL: Duration = Duration::from_secs(48 * 60 * 60);
/// The status record shares the rankings lifetime.
pub const SCRAPE_STATUS_TTL: Duration = RANKINGS_TTL;
/// Applied by `incr` on every backend.
pub const COUNTER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cache key for a single game detail record.
#[must_use]
pub fn game_detail_key(slug: &str) -> String {
    format!("{GAME_DETAIL_PREFIX}{slug}")
}
