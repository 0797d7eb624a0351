use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of entries kept per poll.
pub const TOP_N: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingCategory {
    Men,
    Women,
}

impl RankingCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Men => "men",
            Self::Women => "women",
        }
    }
}

impl std::fmt::Display for RankingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a poll.
///
/// `change` is a signed delta (`"+2"`, `"-3"`), `"NEW"` for a new entrant,
/// or `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: u32,
    pub team: String,
    pub record: String,
    pub points_votes: String,
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingsPayload {
    pub mens: Vec<RankingEntry>,
    pub womens: Vec<RankingEntry>,
    pub updated_at: DateTime<Utc>,
}

impl RankingsPayload {
    /// Both polls are populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.mens.is_empty() && !self.womens.is_empty()
    }
}
