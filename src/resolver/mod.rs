//! Token resolution pipeline
//!
//! Resolvers are composed as a decorator chain, outermost first:
//!
//! 1. [`ErrorReportingResolver`] - normalizes failures to their root cause
//! 2. [`MemoryCacheResolver`] - process-wide in-memory cache (hot path)
//! 3. [`PersistentCacheResolver`] - encrypted on-disk cache
//! 4. [`TokenIssuer`] - the only layer that talks to AWS
//!
//! Each layer is an independent type behind the one [`TokenResolver`] trait,
//! so the chain is assembled at construction time and every layer is testable
//! against a mock inner resolver.

mod issuer;
mod memory;
mod persistent;
mod reporting;

pub use issuer::{AwsCliTokenIssuer, TokenIssuer};
pub use memory::MemoryCacheResolver;
pub use persistent::PersistentCacheResolver;
pub use reporting::ErrorReportingResolver;

use crate::cache::LocalCache;
use crate::endpoint::CodeArtifactEndpoint;
use crate::error::Result;
use crate::logging::Logger;
use crate::token::CodeArtifactToken;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolves an authorization token for a CodeArtifact endpoint.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken>;
}

/// Adapts a [`TokenIssuer`] to sit at the innermost end of a resolver chain.
struct IssuerResolver {
    issuer: Arc<dyn TokenIssuer>,
}

#[async_trait]
impl TokenResolver for IssuerResolver {
    async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
        self.issuer.issue(endpoint).await
    }
}

/// The standard resolver chain over a given issuer and cache directory.
pub struct DefaultTokenResolver {
    chain: ErrorReportingResolver,
}

impl DefaultTokenResolver {
    pub fn new(cache_dir: impl Into<PathBuf>, issuer: Arc<dyn TokenIssuer>, logger: Logger) -> Self {
        let chain = ErrorReportingResolver::new(
            Box::new(MemoryCacheResolver::new(Box::new(
                PersistentCacheResolver::new(
                    LocalCache::new(cache_dir, logger.clone()),
                    Box::new(IssuerResolver { issuer }),
                ),
            ))),
            logger,
        );
        Self { chain }
    }
}

#[async_trait]
impl TokenResolver for DefaultTokenResolver {
    async fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
        self.chain.resolve(endpoint).await
    }
}
