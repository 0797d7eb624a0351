use crate::app_config::{AppConfig, Environment, RemoteCacheCredentials};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "CollegeLacrosseScheduleBot/1.0 (+https://collegelacrosseschedule.com)";
pub const DEFAULT_SCHEDULE_URL: &str = "https://www.livesportsontv.com/league/college-lacrosse";
pub const DEFAULT_ODDS_BASE_URL: &str = "https://api.the-odds-api.com/v4";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("LAXSCHED_ENV", "development"))?;
    let log_level = or_default("LAXSCHED_LOG_LEVEL", "info");

    let remote_cache = resolve_remote_cache(&lookup);
    let odds_api_key = lookup("ODDS_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let odds_base_url = or_default("LAXSCHED_ODDS_BASE_URL", DEFAULT_ODDS_BASE_URL);

    let user_agent = or_default("LAXSCHED_USER_AGENT", DEFAULT_USER_AGENT);
    let request_timeout_secs = parse_u64("LAXSCHED_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LAXSCHED_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "timeout must be at least one second".to_string(),
        });
    }
    let fetch_max_retries = parse_u32("LAXSCHED_FETCH_MAX_RETRIES", "2")?;
    let fetch_backoff_base_ms = parse_u64("LAXSCHED_FETCH_BACKOFF_BASE_MS", "500")?;
    let scrape_max_attempts = parse_u32("LAXSCHED_SCRAPE_MAX_ATTEMPTS", "3")?;
    if scrape_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LAXSCHED_SCRAPE_MAX_ATTEMPTS".to_string(),
            reason: "at least one attempt is required".to_string(),
        });
    }
    let scrape_backoff_base_ms = parse_u64("LAXSCHED_SCRAPE_BACKOFF_BASE_MS", "700")?;

    let policy_allow_list = parse_host_list(&or_default(
        "LAXSCHED_POLICY_ALLOW_LIST",
        "ncaa.com,www.ncaa.com",
    ));
    let schedule_url = or_default("LAXSCHED_SCHEDULE_URL", DEFAULT_SCHEDULE_URL);

    Ok(AppConfig {
        env,
        log_level,
        remote_cache,
        odds_api_key,
        odds_base_url,
        user_agent,
        request_timeout_secs,
        fetch_max_retries,
        fetch_backoff_base_ms,
        scrape_max_attempts,
        scrape_backoff_base_ms,
        policy_allow_list,
        schedule_url,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LAXSCHED_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Resolve remote cache credentials from the environment.
///
/// First match wins:
/// 1. `REDIS_URL` (http/https) with `REDIS_TOKEN`
/// 2. `KV_REST_API_URL` with `KV_REST_API_TOKEN`
/// 3. `REDIS_URL` (http/https) carrying its token as `?token=` or password
/// 4. `UPSTASH_REDIS_REST_URL` with `UPSTASH_REDIS_REST_TOKEN`
fn resolve_remote_cache<F>(lookup: &F) -> Option<RemoteCacheCredentials>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let get = |key: &str| lookup(key).ok().filter(|v| !v.trim().is_empty());

    let redis_url = get("REDIS_URL");
    let redis_token = get("REDIS_TOKEN");

    if let (Some(url), Some(token)) = (&redis_url, &redis_token) {
        if is_http_url(url) {
            return Some(RemoteCacheCredentials {
                url: url.clone(),
                token: token.clone(),
            });
        }
    }

    if let (Some(url), Some(token)) = (get("KV_REST_API_URL"), get("KV_REST_API_TOKEN")) {
        return Some(RemoteCacheCredentials { url, token });
    }

    if let (Some(url), None) = (&redis_url, &redis_token) {
        if let Some(credentials) = split_embedded_token(url) {
            return Some(credentials);
        }
    }

    if let (Some(url), Some(token)) = (
        get("UPSTASH_REDIS_REST_URL"),
        get("UPSTASH_REDIS_REST_TOKEN"),
    ) {
        return Some(RemoteCacheCredentials { url, token });
    }

    None
}

fn is_http_url(raw: &str) -> bool {
    reqwest::Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Pull a token out of `https://host/?token=...` or `https://:token@host`.
fn split_embedded_token(raw: &str) -> Option<RemoteCacheCredentials> {
    let mut url = reqwest::Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let token = url
        .query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| url.password().map(str::to_owned))?;

    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if remaining.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(remaining);
    }
    url.set_password(None).ok()?;
    url.set_username("").ok()?;

    Some(RemoteCacheCredentials {
        url: url.to_string(),
        token,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
