//! Per-game detail page extraction.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use laxsched_core::{AppConfig, GameDetail, StreamingPlatform};

use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::policy::PolicyGate;
use crate::schedule::game_id_from_url;
use crate::text::{detect_platform, extract_affiliate_target, normalize_whitespace, to_absolute_url};

static H1_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static META_DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static WATCH_LIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)watch\s*it\s*live").expect("valid regex"));

/// Paragraphs shorter than this are not used as a description.
const MIN_DESCRIPTION_CHARS: usize = 100;

fn default_description(matchup: &str) -> String {
    format!(
        "This page provides full broadcast information for {matchup}. Here you can see the \
         confirmed start time, TV channel listings, and live streaming options available for \
         this event."
    )
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Text of the nearest enclosing row-like element, which carries the
/// platform name next to a "watch it live" button.
fn row_text(link: ElementRef<'_>) -> String {
    let row = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "li" | "article" | "div"))
        .map(element_text)
        .unwrap_or_default();
    if row.is_empty() {
        element_text(link)
    } else {
        row
    }
}

/// Pure transformation of a detail page into a [`GameDetail`].
#[must_use]
pub fn parse_game_detail(html: &str, detail_url: &str, now: DateTime<Utc>) -> GameDetail {
    let document = Html::parse_document(html);

    let matchup = document
        .select(&H1_SEL)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let description = document
        .select(&META_DESCRIPTION_SEL)
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_whitespace)
        .find(|d| !d.is_empty())
        .or_else(|| {
            document
                .select(&PARAGRAPH_SEL)
                .map(element_text)
                .find(|text| text.chars().count() > MIN_DESCRIPTION_CHARS)
        })
        .unwrap_or_else(|| default_description(&matchup));

    // Keyed by (slug, affiliate URL): first position, last value.
    let mut watch_options: Vec<StreamingPlatform> = Vec::new();
    for link in document.select(&LINK_SEL) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let absolute = to_absolute_url(href, detail_url);
        let is_watch_link = WATCH_LIVE_RE.is_match(&element_text(link))
            || absolute.to_ascii_lowercase().contains("/go/");
        if !is_watch_link {
            continue;
        }
        let platform = detect_platform(&row_text(link), &extract_affiliate_target(&absolute));
        match watch_options
            .iter_mut()
            .find(|p| p.slug == platform.slug && p.affiliate_url == platform.affiliate_url)
        {
            Some(existing) => *existing = platform,
            None => watch_options.push(platform),
        }
    }

    GameDetail {
        game_id: game_id_from_url(detail_url),
        matchup,
        description,
        watch_options,
        detail_url: detail_url.to_owned(),
        scraped_at: now,
    }
}

/// Fetches game detail pages on the schedule site.
#[derive(Debug, Clone)]
pub struct GameDetailExtractor {
    fetcher: PageFetcher,
    policy: PolicyGate,
    site_url: String,
}

impl GameDetailExtractor {
    /// `site_url` is any URL on the schedule site; relative detail URLs are
    /// resolved against it and other origins are refused.
    #[must_use]
    pub fn new(fetcher: PageFetcher, policy: PolicyGate, site_url: &str) -> Self {
        Self {
            fetcher,
            policy,
            site_url: site_url.to_owned(),
        }
    }

    #[must_use]
    pub fn from_config(fetcher: PageFetcher, policy: PolicyGate, config: &AppConfig) -> Self {
        Self::new(fetcher, policy, &config.schedule_url)
    }

    /// Absolute form of `detail_url`, checked to be on the schedule site.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] for URLs on another origin.
    pub fn resolve(&self, detail_url: &str) -> Result<String, ScraperError> {
        let absolute = to_absolute_url(detail_url.trim(), &self.site_url);
        let origin = |u: &str| Url::parse(u).ok().map(|u| u.origin().ascii_serialization());
        match (origin(&absolute), origin(&self.site_url)) {
            (Some(a), Some(b)) if a == b => Ok(absolute),
            _ => Err(ScraperError::InvalidUrl {
                url: detail_url.to_owned(),
                reason: "detail pages must be on the schedule site".to_owned(),
            }),
        }
    }

    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] from [`GameDetailExtractor::resolve`].
    /// - [`ScraperError::PolicyDenied`] before any page fetch.
    /// - Fetch errors from [`PageFetcher::fetch_html`].
    pub async fn extract(&self, detail_url: &str) -> Result<GameDetail, ScraperError> {
        let url = self.resolve(detail_url)?;
        self.policy.ensure_allowed(&url).await?;
        let html = self.fetcher.fetch_html(&url).await?;
        let detail = parse_game_detail(&html, &url, Utc::now());
        tracing::info!(
            url = %url,
            watch_options = detail.watch_options.len(),
            "extracted game detail"
        );
        Ok(detail)
    }
}
