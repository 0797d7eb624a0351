//! D1 poll extraction with per-category source fallback.

mod table;

use chrono::Utc;

use laxsched_core::{RankingCategory, RankingEntry, RankingsPayload};

use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::policy::PolicyGate;

pub use table::parse_rankings_table;

/// A candidate poll page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingSource {
    pub label: String,
    pub url: String,
}

impl RankingSource {
    #[must_use]
    pub fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.to_owned(),
            url: url.to_owned(),
        }
    }
}

/// Built-in candidate sources, most preferred first.
#[must_use]
pub fn default_sources(category: RankingCategory) -> Vec<RankingSource> {
    match category {
        RankingCategory::Men => vec![
            RankingSource::new(
                "NCAA Inside Lacrosse media poll",
                "https://www.ncaa.com/rankings/lacrosse-men/d1/inside-lacrosse-media",
            ),
            RankingSource::new(
                "NCAA USILA coaches poll",
                "https://www.ncaa.com/rankings/lacrosse-men/d1/usila-coaches",
            ),
        ],
        RankingCategory::Women => vec![
            RankingSource::new(
                "NCAA Inside Lacrosse media poll",
                "https://www.ncaa.com/rankings/lacrosse-women/d1/inside-lacrosse-media",
            ),
            RankingSource::new(
                "NCAA IWLCA coaches poll",
                "https://www.ncaa.com/rankings/lacrosse-women/d1/iwlca-coaches",
            ),
        ],
    }
}

#[derive(Debug, Clone)]
pub struct RankingsExtractor {
    fetcher: PageFetcher,
    policy: PolicyGate,
    mens: Vec<RankingSource>,
    womens: Vec<RankingSource>,
}

impl RankingsExtractor {
    #[must_use]
    pub fn new(fetcher: PageFetcher, policy: PolicyGate) -> Self {
        Self {
            fetcher,
            policy,
            mens: default_sources(RankingCategory::Men),
            womens: default_sources(RankingCategory::Women),
        }
    }

    /// Replace the candidate list for one category.
    #[must_use]
    pub fn with_sources(mut self, category: RankingCategory, sources: Vec<RankingSource>) -> Self {
        match category {
            RankingCategory::Men => self.mens = sources,
            RankingCategory::Women => self.womens = sources,
        }
        self
    }

    #[must_use]
    pub fn sources(&self, category: RankingCategory) -> &[RankingSource] {
        match category {
            RankingCategory::Men => &self.mens,
            RankingCategory::Women => &self.womens,
        }
    }

    async fn extract_source(&self, source: &RankingSource) -> Result<Vec<RankingEntry>, ScraperError> {
        self.policy.ensure_allowed(&source.url).await?;
        let html = self.fetcher.fetch_html(&source.url).await?;
        let entries = parse_rankings_table(&html);
        if entries.is_empty() {
            return Err(ScraperError::ExtractionEmpty {
                context: source.url.clone(),
            });
        }
        Ok(entries)
    }

    /// Try each source of `category` in order; the first non-empty table
    /// wins.
    ///
    /// # Errors
    ///
    /// [`ScraperError::PolicyDenied`] when every source was refused by
    /// robots.txt, otherwise [`ScraperError::AllSourcesFailed`] carrying the
    /// last source's error.
    pub async fn extract_category(
        &self,
        category: RankingCategory,
    ) -> Result<Vec<RankingEntry>, ScraperError> {
        let sources = self.sources(category);
        let mut last_error: Option<ScraperError> = None;
        let mut all_denied = !sources.is_empty();

        for source in sources {
            match self.extract_source(source).await {
                Ok(entries) => {
                    tracing::info!(
                        %category,
                        source = %source.label,
                        count = entries.len(),
                        "extracted rankings"
                    );
                    return Ok(entries);
                }
                Err(e) => {
                    tracing::warn!(
                        %category,
                        source = %source.label,
                        url = %source.url,
                        error = %e,
                        "ranking source failed; trying next"
                    );
                    all_denied &= matches!(e, ScraperError::PolicyDenied { .. });
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e @ ScraperError::PolicyDenied { .. }) if all_denied => Err(e),
            last => Err(ScraperError::AllSourcesFailed {
                category,
                attempted: sources.len(),
                last_error: last.map_or_else(|| "no sources configured".to_owned(), |e| e.to_string()),
            }),
        }
    }

    /// Both polls, extracted concurrently. Half a payload is a failure.
    ///
    /// # Errors
    ///
    /// - The men's error when both categories fail.
    /// - [`ScraperError::PolicyDenied`] when the single failed category was
    ///   refused by robots.txt.
    /// - [`ScraperError::PartialCategoryFailure`] when exactly one category
    ///   failed for any other reason.
    pub async fn extract(&self) -> Result<RankingsPayload, ScraperError> {
        let (mens, womens) = tokio::join!(
            self.extract_category(RankingCategory::Men),
            self.extract_category(RankingCategory::Women),
        );
        match (mens, womens) {
            (Ok(mens), Ok(womens)) => Ok(RankingsPayload {
                mens,
                womens,
                updated_at: Utc::now(),
            }),
            (Err(e), Err(_)) => Err(e),
            (Ok(_), Err(e)) => Err(partial(RankingCategory::Women, e)),
            (Err(e), Ok(_)) => Err(partial(RankingCategory::Men, e)),
        }
    }
}

fn partial(category: RankingCategory, err: ScraperError) -> ScraperError {
    match err {
        denied @ ScraperError::PolicyDenied { .. } => denied,
        other => ScraperError::PartialCategoryFailure {
            category,
            reason: other.to_string(),
        },
    }
}
