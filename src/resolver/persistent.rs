//! Persistent token cache layer

use crate::cache::LocalCache;
use crate::endpoint::CodeArtifactEndpoint;
use crate::error::Result;
use crate::token::CodeArtifactToken;
use async_trait::async_trait;

use super::TokenResolver;

/// Serves tokens from the encrypted on-disk cache, delegating to the inner
/// resolver (ultimately the issuer) on a miss and persisting the result.
pub struct PersistentCacheResolver {
    cache: LocalCache,
    inner: Box<dyn TokenResolver>,
}

impl PersistentCacheResolver {
    pub fn new(cache: LocalCache, inner: Box<dyn TokenResolver>) -> Self {
        Self { cache, inner }
    }
}

#[async_trait]
impl TokenResolver for PersistentCacheResolver {
    async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
        self.cache.load(endpoint, self.inner.resolve(endpoint)).await
    }
}
