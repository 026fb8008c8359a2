//! CodeArtifact token resolution and artifact fetching
//!
//! Library behind the `codeartifact-fetch` binary. Resolves short-lived
//! CodeArtifact authorization tokens through a layered cache (in-memory,
//! encrypted on-disk, then the external issuer) and fetches repository
//! artifacts over HTTP with bearer authentication.

pub mod cache;
pub mod cli;
pub mod endpoint;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod proxy;
pub mod resolver;
pub mod token;

pub use cache::LocalCache;
pub use endpoint::CodeArtifactEndpoint;
pub use error::{FetchError, Result};
pub use fetcher::{Resource, ResourceFetcher, ResourceMetadata};
pub use logging::Logger;
pub use proxy::{ProxyResolver, SystemVarResolver};
pub use resolver::{
    AwsCliTokenIssuer, DefaultTokenResolver, ErrorReportingResolver, MemoryCacheResolver,
    PersistentCacheResolver, TokenIssuer, TokenResolver,
};
pub use token::CodeArtifactToken;
