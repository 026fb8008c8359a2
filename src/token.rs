//! Authorization token value type

use crate::endpoint::CodeArtifactEndpoint;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as unusable this long before their hard expiry, to
/// absorb remote clock skew and in-flight request latency.
pub const EXPIRY_SKEW_MINUTES: i64 = 20;

/// A short-lived CodeArtifact bearer token bound to one endpoint.
///
/// Immutable; a stale token is replaced by a fresh one, never updated in
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifactToken {
    pub endpoint: CodeArtifactEndpoint,
    pub value: String,
    pub expiration: DateTime<Utc>,
}

impl CodeArtifactToken {
    pub fn new(
        endpoint: CodeArtifactEndpoint,
        value: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint,
            value: value.into(),
            expiration,
        }
    }

    /// Whether the token is within the skew window of its expiration.
    pub fn expired(&self) -> bool {
        self.expiration - Duration::minutes(EXPIRY_SKEW_MINUTES) <= Utc::now()
    }

    /// Time remaining until hard expiry; negative once past it.
    pub fn expires_in(&self) -> Duration {
        self.expiration - Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> CodeArtifactEndpoint {
        CodeArtifactEndpoint::parse(
            "https://env-production-123456789012.d.codeartifact.eu-west-1.amazonaws.com/maven/env-data",
        )
        .unwrap()
    }

    #[test]
    fn token_inside_skew_window_is_expired() {
        let token =
            CodeArtifactToken::new(endpoint(), "abcdef", Utc::now() + Duration::minutes(19));
        assert!(token.expired());
    }

    #[test]
    fn token_outside_skew_window_is_not_expired() {
        let token =
            CodeArtifactToken::new(endpoint(), "abcdef", Utc::now() + Duration::minutes(21));
        assert!(!token.expired());
    }

    #[test]
    fn long_expired_token_is_expired() {
        let token = CodeArtifactToken::new(endpoint(), "abcdef", Utc::now() - Duration::hours(1));
        assert!(token.expired());
    }

    #[test]
    fn serialization_round_trips() {
        let token = CodeArtifactToken::new(endpoint(), "abcdef", Utc::now() + Duration::hours(1));
        let json = serde_json::to_string(&token).unwrap();
        let back: CodeArtifactToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
