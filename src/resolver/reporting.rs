//! Error normalization layer

use crate::endpoint::CodeArtifactEndpoint;
use crate::error::{FetchError, Result};
use crate::logging::Logger;
use crate::token::CodeArtifactToken;
use async_trait::async_trait;

use super::TokenResolver;

/// Outermost resolver layer: unwraps any failure from the chain to its root
/// cause, emits one diagnostic line identifying the endpoint by cache key,
/// and re-raises a typed resolution error. Token values never appear in
/// either the diagnostic or the error.
pub struct ErrorReportingResolver {
    inner: Box<dyn TokenResolver>,
    logger: Logger,
}

impl ErrorReportingResolver {
    pub fn new(inner: Box<dyn TokenResolver>, logger: Logger) -> Self {
        Self { inner, logger }
    }
}

#[async_trait]
impl TokenResolver for ErrorReportingResolver {
    async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
        match self.inner.resolve(endpoint).await {
            Ok(token) => Ok(token),
            Err(err) => {
                let cache_key = endpoint.cache_key();
                let message = err.root_cause_message();
                self.logger.error(&format!(
                    "failed to obtain CodeArtifact token for {}: {}",
                    cache_key, message
                ));
                Err(FetchError::TokenResolution {
                    cache_key,
                    message,
                    source: Box::new(err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingResolver;

    #[async_trait]
    impl TokenResolver for FailingResolver {
        async fn resolve(&self, _endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
            Err(FetchError::Issuance("access denied".to_string()))
        }
    }

    fn endpoint() -> CodeArtifactEndpoint {
        CodeArtifactEndpoint::parse(
            "https://test-domain-123456789012.d.codeartifact.eu-west-1.amazonaws.com/maven/env-data",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn wraps_failure_with_cache_key_and_root_cause() {
        let resolver = ErrorReportingResolver::new(Box::new(FailingResolver), Logger::new_quiet());
        let err = resolver.resolve(&endpoint()).await.unwrap_err();
        match err {
            FetchError::TokenResolution {
                cache_key, message, ..
            } => {
                assert_eq!(cache_key, "test-domain-123456789012-eu-west-1");
                assert_eq!(message, "Token issuance failed: access denied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
