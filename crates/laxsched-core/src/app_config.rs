#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Endpoint and bearer token for the remote REST key/value service.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCacheCredentials {
    pub url: String,
    pub token: String,
}

impl std::fmt::Debug for RemoteCacheCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCacheCredentials")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// `None` selects the in-process cache backend.
    pub remote_cache: Option<RemoteCacheCredentials>,
    /// `None` disables odds enrichment.
    pub odds_api_key: Option<String>,
    pub odds_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    pub scrape_max_attempts: u32,
    pub scrape_backoff_base_ms: u64,
    /// Hosts that stay readable when their robots.txt disallows us.
    pub policy_allow_list: Vec<String>,
    pub schedule_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("remote_cache", &self.remote_cache)
            .field(
                "odds_api_key",
                &self.odds_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("odds_base_url", &self.odds_base_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .field("scrape_max_attempts", &self.scrape_max_attempts)
            .field("scrape_backoff_base_ms", &self.scrape_backoff_base_ms)
            .field("policy_allow_list", &self.policy_allow_list)
            .field("schedule_url", &self.schedule_url)
            .finish()
    }
}
