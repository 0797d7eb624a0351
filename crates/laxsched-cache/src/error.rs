use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from cache service")]
    UnexpectedStatus { status: u16 },

    #[error("cache service error: {0}")]
    Remote(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
