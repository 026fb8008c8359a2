//! Authenticated resource fetch layer
//!
//! Fetches artifacts from a CodeArtifact repository over HTTP(S), resolving
//! the endpoint identity from the request URL, attaching a bearer token from
//! the resolver pipeline and optionally routing through a configured proxy.
//! "Not found" on metadata and listing lookups is an expected negative result
//! and maps to `None`, never an error.

use crate::endpoint::CodeArtifactEndpoint;
use crate::error::{FetchError, Result};
use crate::logging::Logger;
use crate::proxy::ProxyResolver;
use crate::resolver::TokenResolver;
use chrono::{DateTime, Utc};
use futures::Stream;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, StatusCode};
use std::sync::Arc;
use std::sync::LazyLock;
use url::Url;

/// Descriptive client identification sent with every request
pub static USER_AGENT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "codeartifact-fetch/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
});

static ANCHOR_HREF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*"([^"]+)""#).expect("href regex is valid"));

/// Metadata extracted from response headers. Absent or malformed header
/// values degrade to defaults rather than failing the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    pub location: Url,
    /// Defaults to the epoch when the header is absent or unparsable
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
    /// Last path segment of the request URL
    pub filename: Option<String>,
    /// -1 when the header is absent or unparsable
    pub content_length: i64,
    pub etag: Option<String>,
    /// SHA-256 content checksum advertised by the registry, when present
    pub checksum_sha256: Option<String>,
}

impl ResourceMetadata {
    fn from_response(location: Url, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        };

        let last_modified = header("last-modified")
            .and_then(|value| DateTime::parse_from_rfc2822(&value).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let content_length = header("content-length")
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(-1);

        let checksum_sha256 = header("x-checksum-sha2")
            .filter(|value| value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()));

        let filename = location
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_string());

        Self {
            last_modified,
            content_type: header("content-type"),
            filename,
            content_length,
            etag: header("etag"),
            checksum_sha256,
            location,
        }
    }
}

/// An open resource: response metadata plus the (not yet consumed) body.
#[derive(Debug)]
pub struct Resource {
    pub metadata: ResourceMetadata,
    response: Response,
}

impl Resource {
    /// Buffer the full body.
    pub async fn bytes(self) -> Result<Vec<u8>> {
        Ok(self.response.bytes().await?.to_vec())
    }

    /// Stream the body without buffering.
    pub fn bytes_stream(self) -> impl Stream<Item = reqwest::Result<bytes::Bytes>> {
        self.response.bytes_stream()
    }
}

/// Fetches registry resources with bearer authentication.
pub struct ResourceFetcher {
    client: reqwest::Client,
    proxy: ProxyResolver,
    resolver: Arc<dyn TokenResolver>,
    logger: Logger,
}

impl ResourceFetcher {
    pub fn new(
        client: reqwest::Client,
        proxy: ProxyResolver,
        resolver: Arc<dyn TokenResolver>,
        logger: Logger,
    ) -> Self {
        Self {
            client,
            proxy,
            resolver,
            logger,
        }
    }

    /// GET a resource. Non-success statuses are errors; the connection is
    /// released when the response is dropped on any path.
    pub async fn get(&self, location: &str) -> Result<Resource> {
        let (url, response) = self.execute(Method::GET, location).await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Resource {
            metadata: ResourceMetadata::from_response(url, response.headers()),
            response,
        })
    }

    /// HEAD a resource. A 404 is a normal negative result (`Ok(None)`).
    pub async fn head(&self, location: &str) -> Result<Option<ResourceMetadata>> {
        let (url, response) = self.execute(Method::HEAD, location).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(Some(ResourceMetadata::from_response(url, response.headers())))
            }
            status => Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    /// List a directory path by parsing its HTML index. A missing directory
    /// yields `Ok(None)`.
    pub async fn list(&self, location: &str) -> Result<Option<Vec<String>>> {
        let (url, response) = self.execute(Method::GET, location).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await?;
                Ok(Some(parse_directory_listing(&url, &body)))
            }
            status => Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn execute(&self, method: Method, location: &str) -> Result<(Url, Response)> {
        let endpoint = CodeArtifactEndpoint::require(location)?;
        let url = self.effective_url(&endpoint)?;
        let token = self.resolver.resolve(&endpoint).await?;

        self.logger
            .debug(&format!("{} {}", method, url));
        let response = self
            .client
            .request(method, url.clone())
            .header("Authorization", format!("Bearer {}", token.value))
            .header("User-Agent", USER_AGENT.as_str())
            .send()
            .await?;
        Ok((url, response))
    }

    /// The network target: the configured proxy base with the original path
    /// appended, or the direct https form of the request URL.
    fn effective_url(&self, endpoint: &CodeArtifactEndpoint) -> Result<Url> {
        match self.proxy.resolve(endpoint) {
            Some(base) => base
                .join(endpoint.url.path())
                .map_err(|e| FetchError::Configuration(format!("invalid proxy base URL: {}", e))),
            None => Ok(endpoint.to_https_url()),
        }
    }
}

/// Extract entry names from a directory-index HTML body.
fn parse_directory_listing(directory: &Url, body: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for captures in ANCHOR_HREF_REGEX.captures_iter(body) {
        let href = &captures[1];
        if href.starts_with('?') || href.starts_with('#') || href.starts_with("../") {
            continue;
        }
        // Absolute hrefs only count when they point below this directory.
        let name = if let Some(stripped) = href.strip_prefix(directory.as_str()) {
            stripped
        } else if href.contains("://") {
            continue;
        } else {
            href
        };
        let name = name.trim_start_matches('/').trim_end_matches('/');
        if name.is_empty() || name.contains('/') {
            continue;
        }
        if !entries.iter().any(|existing| existing == name) {
            entries.push(name.to_string());
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!(
            "https://d-123456789012.d.codeartifact.eu-west-1.amazonaws.com{}",
            path
        ))
        .unwrap()
    }

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn metadata_defaults_when_headers_absent() {
        let meta = ResourceMetadata::from_response(url("/maven/repo/a/b/c.pom"), &headers(&[]));
        assert_eq!(meta.last_modified, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(meta.content_length, -1);
        assert_eq!(meta.content_type, None);
        assert_eq!(meta.etag, None);
        assert_eq!(meta.checksum_sha256, None);
        assert_eq!(meta.filename.as_deref(), Some("c.pom"));
    }

    #[test]
    fn metadata_parses_populated_headers() {
        let meta = ResourceMetadata::from_response(
            url("/maven/repo/a/b/c.pom"),
            &headers(&[
                ("last-modified", "Wed, 23 Apr 2025 19:04:34 GMT"),
                ("content-type", "text/xml"),
                ("content-length", "1234"),
                ("etag", "\"abc\""),
                (
                    "x-checksum-sha2",
                    "9eae15989ef6bf8401fe30edaf6b00d28547125a4be6717ed009b491c0303161",
                ),
            ]),
        );
        assert_eq!(meta.last_modified.to_rfc3339(), "2025-04-23T19:04:34+00:00");
        assert_eq!(meta.content_type.as_deref(), Some("text/xml"));
        assert_eq!(meta.content_length, 1234);
        assert_eq!(meta.etag.as_deref(), Some("\"abc\""));
        assert_eq!(
            meta.checksum_sha256.as_deref(),
            Some("9eae15989ef6bf8401fe30edaf6b00d28547125a4be6717ed009b491c0303161")
        );
    }

    #[test]
    fn malformed_header_values_degrade_to_defaults() {
        let meta = ResourceMetadata::from_response(
            url("/maven/repo/a/b/c.pom"),
            &headers(&[
                ("last-modified", "not a date"),
                ("content-length", "lots"),
                ("x-checksum-sha2", "definitely-not-hex"),
            ]),
        );
        assert_eq!(meta.last_modified, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(meta.content_length, -1);
        assert_eq!(meta.checksum_sha256, None);
    }

    #[test]
    fn listing_parses_relative_and_absolute_entries() {
        let directory = url("/maven/repo/com/example/lib/");
        let body = format!(
            r#"<html><body>
            <a href="../">Parent Directory</a>
            <a href="1.0.0/">1.0.0/</a>
            <a href="{}1.0.1/">1.0.1/</a>
            <a href="maven-metadata.xml">maven-metadata.xml</a>
            <a href="?sort=date">sort</a>
            <a href="https://elsewhere.example.com/other/">other</a>
            </body></html>"#,
            directory
        );
        assert_eq!(
            parse_directory_listing(&directory, &body),
            vec!["1.0.0", "1.0.1", "maven-metadata.xml"]
        );
    }

    #[test]
    fn listing_of_plain_body_is_empty() {
        assert!(parse_directory_listing(&url("/maven/repo/"), "not html").is_empty());
    }
}
