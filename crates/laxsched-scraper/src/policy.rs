//! Per-origin crawl-permission gate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::Url;
use tokio::time::Instant;

use laxsched_core::AppConfig;

use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::robots::RobotsRules;

/// How long a fetched robots.txt is trusted before it is fetched again.
pub const POLICY_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug)]
struct CachedPolicy {
    rules: Arc<RobotsRules>,
    fetched_at: Instant,
}

/// Checks URLs against their origin's robots.txt before any content fetch.
///
/// Denials on hosts in the allow-list are logged and ignored. A policy
/// document that cannot be fetched allows everything and is not cached, so
/// the next check tries again.
///
/// Clones share the policy cache.
#[derive(Debug, Clone)]
pub struct PolicyGate {
    fetcher: PageFetcher,
    allow_list: Arc<Vec<String>>,
    cache: Arc<Mutex<HashMap<String, CachedPolicy>>>,
    in_flight: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl PolicyGate {
    #[must_use]
    pub fn new(fetcher: PageFetcher, allow_list: Vec<String>) -> Self {
        Self {
            fetcher,
            allow_list: Arc::new(
                allow_list
                    .into_iter()
                    .map(|h| h.to_ascii_lowercase())
                    .collect(),
            ),
            cache: Arc::default(),
            in_flight: Arc::default(),
        }
    }

    #[must_use]
    pub fn from_config(fetcher: PageFetcher, config: &AppConfig) -> Self {
        Self::new(fetcher, config.policy_allow_list.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedPolicy>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Succeeds when `url` may be fetched.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - [`ScraperError::PolicyDenied`] if robots.txt disallows the path and
    ///   the host is not allow-listed.
    pub async fn ensure_allowed(&self, url: &str) -> Result<(), ScraperError> {
        let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        if host.is_empty() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidUrl {
                url: url.to_owned(),
                reason: "expected an absolute http(s) URL".to_owned(),
            });
        }

        let origin = parsed.origin().ascii_serialization();
        let Some(rules) = self.rules_for(&origin).await else {
            return Ok(());
        };

        let mut path = parsed.path().to_owned();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }
        if rules.is_allowed(&path, self.fetcher.user_agent()) {
            return Ok(());
        }

        if self.allow_list.iter().any(|allowed| *allowed == host) {
            tracing::warn!(url, host = %host, "robots.txt disallows URL; proceeding for allow-listed host");
            return Ok(());
        }
        tracing::warn!(url, "robots.txt disallows URL");
        Err(ScraperError::PolicyDenied {
            url: url.to_owned(),
        })
    }

    fn cached_rules(&self, origin: &str) -> Option<Arc<RobotsRules>> {
        self.lock()
            .get(origin)
            .filter(|entry| entry.fetched_at.elapsed() < POLICY_TTL)
            .map(|entry| Arc::clone(&entry.rules))
    }

    fn fetch_lock(&self, origin: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(origin.to_owned()).or_default())
    }

    async fn rules_for(&self, origin: &str) -> Option<Arc<RobotsRules>> {
        if let Some(rules) = self.cached_rules(origin) {
            return Some(rules);
        }

        // One robots.txt fetch per origin at a time; waiters reuse its result.
        let fetch_lock = self.fetch_lock(origin);
        let _guard = fetch_lock.lock().await;
        if let Some(rules) = self.cached_rules(origin) {
            return Some(rules);
        }

        let robots_url = format!("{origin}/robots.txt");
        let Some(body) = self.fetcher.fetch_policy_document(&robots_url).await else {
            tracing::warn!(origin, "robots.txt unavailable; allowing fetch");
            return None;
        };
        let rules = Arc::new(RobotsRules::parse(&body));
        tracing::debug!(origin, "cached robots.txt");
        self.lock().insert(
            origin.to_owned(),
            CachedPolicy {
                rules: Arc::clone(&rules),
                fetched_at: Instant::now(),
            },
        );
        Some(rules)
    }
}
