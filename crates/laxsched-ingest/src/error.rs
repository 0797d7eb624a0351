use laxsched_cache::CacheError;
use laxsched_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}
