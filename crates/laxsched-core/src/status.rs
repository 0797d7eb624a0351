use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-domain bookkeeping of ingestion runs.
///
/// Success and failure are tracked independently: a failed run records its
/// message but leaves the previous success time in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_next_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rankings_last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rankings_last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rankings_next_run: Option<DateTime<Utc>>,
}

/// Result of an ingestion run: fresh data, or the last good snapshot
/// flagged as stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutcome<T> {
    pub data: T,
    pub stale: bool,
}

impl<T> ScrapeOutcome<T> {
    #[must_use]
    pub fn fresh(data: T) -> Self {
        Self { data, stale: false }
    }

    #[must_use]
    pub fn stale(data: T) -> Self {
        Self { data, stale: true }
    }
}
