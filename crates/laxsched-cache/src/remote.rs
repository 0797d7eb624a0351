//! REST key/value backend (Upstash-compatible command protocol).
//!
//! Every operation is a `POST` of a JSON command array such as
//! `["SET", "key", "<json>", "EX", 3600]` to the service root, answered with
//! `{"result": ...}` or `{"error": "..."}`. Values are stored as JSON text.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use laxsched_core::cache_keys::COUNTER_TTL;

use crate::error::CacheError;

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for a remote REST key/value service.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    url: String,
    token: String,
}

impl RemoteStore {
    /// # Errors
    ///
    /// Returns [`CacheError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(url: &str, token: &str, timeout_secs: u64) -> Result<Self, CacheError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let result = self.command(&json!(["GET", key])).await?;
        match result {
            Value::Null => Ok(None),
            // Values written by this store are JSON text; anything else
            // written by another client is surfaced as a plain string.
            Value::String(text) => Ok(Some(
                serde_json::from_str(&text).unwrap_or(Value::String(text)),
            )),
            other => Ok(Some(other)),
        }
    }

    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let text = serde_json::to_string(value).map_err(|e| CacheError::Deserialize {
            context: format!("value for {key}"),
            source: e,
        })?;
        let command = match ttl {
            Some(ttl) => json!(["SET", key, text, "EX", ttl_secs(ttl)]),
            None => json!(["SET", key, text]),
        };
        self.command(&command).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.command(&json!(["DEL", key])).await?;
        Ok(())
    }

    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let result = self.command(&json!(["KEYS", format!("{prefix}*")])).await?;
        let mut keys: Vec<String> =
            serde_json::from_value(result).map_err(|e| CacheError::Deserialize {
                context: format!("KEYS {prefix}*"),
                source: e,
            })?;
        keys.sort();
        Ok(keys)
    }

    /// Increment a counter and (re)apply the week-long counter TTL.
    pub async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let result = self.command(&json!(["INCR", key])).await?;
        let count = result
            .as_i64()
            .ok_or_else(|| CacheError::Remote(format!("INCR {key} returned {result}")))?;
        self.command(&json!(["EXPIRE", key, ttl_secs(COUNTER_TTL)]))
            .await?;
        Ok(count)
    }

    /// Enumerate then delete. Not atomic: keys written in between survive.
    pub async fn clear_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let keys = self.keys_with_prefix(prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut command = vec![Value::from("DEL")];
        command.extend(keys.iter().map(|k| Value::from(k.as_str())));
        self.command(&Value::Array(command)).await?;
        Ok(keys.len())
    }

    async fn command(&self, command: &Value) -> Result<Value, CacheError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(command)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: Option<CommandResponse> = serde_json::from_str(&body).ok();
        if let Some(CommandResponse {
            error: Some(message),
            ..
        }) = parsed
        {
            return Err(CacheError::Remote(message));
        }
        if !status.is_success() {
            return Err(CacheError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
        match parsed {
            Some(response) => Ok(response.result.unwrap_or(Value::Null)),
            None => Err(CacheError::Remote(format!(
                "unparseable response body: {}",
                body.chars().take(200).collect::<String>()
            ))),
        }
    }
}

/// Whole seconds, rounded up, never zero.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
