//! Outbound HTTP for every extractor.
//!
//! One [`PageFetcher`] is built per process so that the identifying
//! user-agent, timeouts and retry budget are applied uniformly to schedule
//! pages, poll pages, robots.txt and the odds API.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use laxsched_core::AppConfig;

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

/// Thin wrapper over a shared `reqwest::Client`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    user_agent: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PageFetcher {
    /// `max_retries` is the number of extra attempts for transient failures;
    /// `0` disables retries.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.fetch_max_retries,
            config.fetch_backoff_base_ms,
        )
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch an HTML page, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] for a non-2xx response.
    /// - [`ScraperError::ChallengePage`] when the body is an anti-bot
    ///   interstitial rather than content.
    /// - [`ScraperError::Http`] for network failures and timeouts.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, url, || async move {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }
            let body = response.text().await?;
            if looks_like_challenge_page(&body) {
                return Err(ScraperError::ChallengePage {
                    url: url.to_owned(),
                });
            }
            Ok(body)
        })
        .await
    }

    /// GET a JSON document, retrying transient failures. `query` is appended
    /// to `url` and kept out of logs and error messages, so credentials
    /// belong there rather than in `url`.
    ///
    /// # Errors
    ///
    /// Same fetch errors as [`PageFetcher::fetch_html`], plus
    /// [`ScraperError::Deserialize`] when the body does not match `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ScraperError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, url, || async move {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(reqwest::Error::without_url)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }
            Ok(response.text().await.map_err(reqwest::Error::without_url)?)
        })
        .await?;
        serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
            context: url.to_owned(),
            source: e,
        })
    }

    /// Single-attempt GET of a crawl-policy document. `None` means the
    /// document could not be obtained (network failure or non-2xx).
    pub(crate) async fn fetch_policy_document(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, error = %e, "robots.txt fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url, status = response.status().as_u16(), "robots.txt unavailable");
            return None;
        }
        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(url, error = %e, "robots.txt body unreadable");
                None
            }
        }
    }
}

/// Detects anti-bot interstitials served with a 2xx status.
pub(crate) fn looks_like_challenge_page(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("enable cookies");
    let has_cf_chl = lowered.contains("cf-chl");
    let has_akamai_denial = lowered.contains("access denied") && lowered.contains("reference #");
    let has_human_check = lowered.contains("verify you are human");
    let has_interruption = lowered.contains("pardon our interruption");

    has_cloudflare_banner
        || has_challenge_platform
        || (has_just_a_moment && (has_cookie_gate || has_cf_chl))
        || has_akamai_denial
        || has_human_check
        || has_interruption
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloudflare_interstitial() {
        let body = "<html><head><title>Just a moment...</title></head>\
                    <body>Please enable cookies.</body></html>";
        assert!(looks_like_challenge_page(body));
    }

    #[test]
    fn detects_challenge_platform_script() {
        let body = r#"<script src="/cdn-cgi/challenge-platform/h/b/orchestrate"></script>"#;
        assert!(looks_like_challenge_page(body));
    }

    #[test]
    fn detects_access_denied_with_reference() {
        let body = "<h1>Access Denied</h1><p>Reference #18.abcdef</p>";
        assert!(looks_like_challenge_page(body));
    }

    #[test]
    fn just_a_moment_alone_is_not_a_challenge() {
        assert!(!looks_like_challenge_page(
            "<p>Just a moment... the faceoff is coming up.</p>"
        ));
    }

    #[test]
    fn ordinary_poll_page_is_not_a_challenge() {
        let body = "<table><tr><th>Rank</th><th>School</th></tr>\
                    <tr><td>1</td><td>Notre Dame</td></tr></table>";
        assert!(!looks_like_challenge_page(body));
    }
}
