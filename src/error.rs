use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Page-fetch failures. All of these are recoverable: the pipeline that hit
/// one reports zero results for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("could not open fetch session after {attempts} attempt(s): {message}")]
    Session { attempts: u32, message: String },

    #[error("no page available for {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
