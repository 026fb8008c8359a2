//! In-memory token cache layer

use crate::endpoint::CodeArtifactEndpoint;
use crate::error::Result;
use crate::token::CodeArtifactToken;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::TokenResolver;

/// Caches tokens in a process-wide map keyed by endpoint cache key.
///
/// The lock is not held across the delegate call, so concurrent misses for
/// the same key may each trigger a refresh; every refresh yields an equally
/// valid token and the last write wins. An expired token is never served.
pub struct MemoryCacheResolver {
    inner: Box<dyn TokenResolver>,
    cache: Mutex<HashMap<String, CodeArtifactToken>>,
}

impl MemoryCacheResolver {
    pub fn new(inner: Box<dyn TokenResolver>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, cache_key: &str) -> Option<CodeArtifactToken> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(cache_key)
            .filter(|token| !token.expired())
            .cloned()
    }
}

#[async_trait]
impl TokenResolver for MemoryCacheResolver {
    async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
        let cache_key = endpoint.cache_key();
        if let Some(token) = self.cached(&cache_key) {
            return Ok(token);
        }

        let token = self.inner.resolve(endpoint).await?;
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(cache_key, token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::sync::Arc;

    struct CountingResolver {
        calls: Arc<AtomicUsize>,
        expired: bool,
    }

    #[async_trait]
    impl TokenResolver for CountingResolver {
        async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let expiration = if self.expired {
                Utc::now() - Duration::hours(1)
            } else {
                Utc::now() + Duration::hours(1)
            };
            Ok(CodeArtifactToken::new(
                endpoint.clone(),
                format!("token-{}", call),
                expiration,
            ))
        }
    }

    fn counting_resolver(expired: bool) -> (MemoryCacheResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = MemoryCacheResolver::new(Box::new(CountingResolver {
            calls: calls.clone(),
            expired,
        }));
        (resolver, calls)
    }

    fn endpoint() -> CodeArtifactEndpoint {
        CodeArtifactEndpoint::parse(
            "https://test-domain-123456789012.d.codeartifact.eu-west-1.amazonaws.com/maven/env-data",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn serves_cached_token_without_delegating() {
        let (resolver, calls) = counting_resolver(false);

        let first = resolver.resolve(&endpoint()).await.unwrap();
        for _ in 0..10 {
            let again = resolver.resolve(&endpoint()).await.unwrap();
            assert_eq!(again.value, first.value);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_is_never_served() {
        let (resolver, calls) = counting_resolver(true);

        // Every resolve sees the cached token as expired and delegates again.
        resolver.resolve(&endpoint()).await.unwrap();
        resolver.resolve(&endpoint()).await.unwrap();
        resolver.resolve(&endpoint()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(resolver.cached(&endpoint().cache_key()).is_none());
    }

    #[tokio::test]
    async fn distinct_endpoints_cache_independently() {
        let (resolver, calls) = counting_resolver(false);
        let other = CodeArtifactEndpoint::parse(
            "https://test-domain-123456789012.d.codeartifact.us-east-1.amazonaws.com/maven/env-data",
        )
        .unwrap();

        resolver.resolve(&endpoint()).await.unwrap();
        resolver.resolve(&other).await.unwrap();
        resolver.resolve(&endpoint()).await.unwrap();
        resolver.resolve(&other).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
