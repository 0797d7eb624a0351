use laxsched_core::RankingCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("robots.txt disallows fetching {url}")]
    PolicyDenied { url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("anti-bot challenge page returned by {url}")]
    ChallengePage { url: String },

    #[error("no usable records extracted from {context}")]
    ExtractionEmpty { context: String },

    #[error("rankings incomplete: {category} poll failed: {reason}")]
    PartialCategoryFailure {
        category: RankingCategory,
        reason: String,
    },

    #[error("all {attempted} {category} ranking sources failed; last error: {last_error}")]
    AllSourcesFailed {
        category: RankingCategory,
        attempted: usize,
        last_error: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// Returns `true` if another attempt could plausibly succeed.
    ///
    /// Crawl-policy denials, malformed responses and bad URLs are permanent;
    /// network failures, non-2xx statuses, challenge pages and empty
    /// extractions are transient.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::UnexpectedStatus { .. }
                | Self::ChallengePage { .. }
                | Self::ExtractionEmpty { .. }
                | Self::PartialCategoryFailure { .. }
                | Self::AllSourcesFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_denied_is_permanent() {
        let err = ScraperError::PolicyDenied {
            url: "https://example.com/private".to_owned(),
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn fetch_failures_are_transient() {
        assert!(ScraperError::UnexpectedStatus {
            status: 503,
            url: "https://example.com".to_owned(),
        }
        .is_retriable());
        assert!(ScraperError::ChallengePage {
            url: "https://example.com".to_owned(),
        }
        .is_retriable());
        assert!(ScraperError::ExtractionEmpty {
            context: "schedule".to_owned(),
        }
        .is_retriable());
    }

    #[test]
    fn partial_failure_names_the_category() {
        let err = ScraperError::PartialCategoryFailure {
            category: RankingCategory::Women,
            reason: "no rows".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "rankings incomplete: women poll failed: no rows"
        );
    }
}
