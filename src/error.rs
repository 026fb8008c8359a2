//! Error types for token resolution and artifact fetch operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    /// A caller required a CodeArtifact endpoint but the URL did not match
    #[error("Invalid CodeArtifact endpoint: {0}")]
    InvalidEndpoint(String),

    /// Configuration errors (bad proxy URL, unusable cache directory, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure to obtain an authorization token, normalized to the root cause.
    /// Identifies the endpoint by cache key only; never carries a token value.
    #[error("Failed to obtain CodeArtifact token for {cache_key}: {message}")]
    TokenResolution {
        cache_key: String,
        message: String,
        #[source]
        source: Box<FetchError>,
    },

    /// The external token issuer failed (credentials, network, permissions)
    #[error("Token issuance failed: {0}")]
    Issuance(String),

    /// Local cache I/O errors that cannot be absorbed as a miss
    #[error("Cache error: {0}")]
    Cache(String),

    /// Network / HTTP transport errors
    #[error("Network error: {0}")]
    Network(String),

    /// A resource fetch returned a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// Parse errors (JSON payloads, directory listings, header values)
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl FetchError {
    /// Walk the source chain to the deepest underlying cause message.
    pub fn root_cause_message(&self) -> String {
        let mut cause: &dyn std::error::Error = self;
        while let Some(next) = cause.source() {
            cause = next;
        }
        cause.to_string()
    }
}
