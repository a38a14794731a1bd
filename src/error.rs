use std::path::PathBuf;

use thiserror::Error;

/// Setup failures that prevent a run from starting.
///
/// Failures of individual requests are never reported through this type; they
/// become unsuccessful [`TestResult`](crate::testing::TestResult)s instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid suite: {0}")]
    Suite(String),

    #[error("Invalid base URL `{url}`: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
