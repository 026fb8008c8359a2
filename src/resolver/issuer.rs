//! Token issuance via the AWS CLI
//!
//! Issuance is the only layer performing network I/O against AWS. It is kept
//! behind the [`TokenIssuer`] trait so the resolver chain never depends on a
//! particular transport; the shipped implementation shells out to
//! `aws codeartifact get-authorization-token`, inheriting the full AWS
//! credential chain (profiles, environment, assumed roles) from the CLI.

use crate::endpoint::CodeArtifactEndpoint;
use crate::error::{FetchError, Result};
use crate::proxy::SystemVarResolver;
use crate::token::CodeArtifactToken;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;

const PROFILE_KEY: &str = "codeartifact.profile";
const DURATION_KEY: &str = "codeartifact.token.duration-seconds";

/// Issues a fresh authorization token for an endpoint.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationTokenResponse {
    authorization_token: String,
    expiration: serde_json::Value,
}

/// [`TokenIssuer`] backed by the AWS CLI.
pub struct AwsCliTokenIssuer {
    vars: SystemVarResolver,
}

impl AwsCliTokenIssuer {
    pub fn new(vars: SystemVarResolver) -> Self {
        Self { vars }
    }

    /// Profile requested via the endpoint URL query takes precedence over
    /// the configured one, so a single build can mix profiles per repository.
    fn profile(&self, endpoint: &CodeArtifactEndpoint) -> Option<String> {
        endpoint
            .url
            .query_pairs()
            .find(|(key, _)| key == PROFILE_KEY)
            .map(|(_, value)| value.into_owned())
            .or_else(|| self.vars.resolve(&[PROFILE_KEY]))
    }
}

#[async_trait]
impl TokenIssuer for AwsCliTokenIssuer {
    async fn issue(&self, endpoint: &CodeArtifactEndpoint) -> Result<CodeArtifactToken> {
        let mut command = Command::new("aws");
        command
            .arg("codeartifact")
            .arg("get-authorization-token")
            .arg("--domain")
            .arg(&endpoint.domain)
            .arg("--domain-owner")
            .arg(&endpoint.domain_owner)
            .arg("--region")
            .arg(&endpoint.region)
            .arg("--output")
            .arg("json");
        if let Some(profile) = self.profile(endpoint) {
            command.arg("--profile").arg(profile);
        }
        if let Some(duration) = self.vars.resolve(&[DURATION_KEY]) {
            command.arg("--duration-seconds").arg(duration);
        }

        let output = command
            .output()
            .await
            .map_err(|e| FetchError::Issuance(format!("failed to run aws cli: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Issuance(format!(
                "aws codeartifact get-authorization-token failed for {}: {}",
                endpoint.cache_key(),
                stderr.trim()
            )));
        }

        let response: AuthorizationTokenResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| FetchError::Issuance(format!("unparseable token response: {}", e)))?;
        let expiration = parse_expiration(&response.expiration)?;
        Ok(CodeArtifactToken::new(
            endpoint.clone(),
            response.authorization_token,
            expiration,
        ))
    }
}

/// The CLI emits the expiration either as an ISO-8601 string or as an epoch
/// number, depending on its configured timestamp format.
fn parse_expiration(value: &serde_json::Value) -> Result<DateTime<Utc>> {
    match value {
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FetchError::Issuance(format!("unparseable token expiration: {}", e))),
        serde_json::Value::Number(number) => {
            let epoch = number
                .as_f64()
                .ok_or_else(|| FetchError::Issuance("unparseable token expiration".to_string()))?;
            Utc.timestamp_opt(epoch as i64, 0)
                .single()
                .ok_or_else(|| FetchError::Issuance("token expiration out of range".to_string()))
        }
        other => Err(FetchError::Issuance(format!(
            "unexpected token expiration value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso8601_expiration() {
        let value = serde_json::json!("2030-04-23T19:04:34+00:00");
        let parsed = parse_expiration(&value).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2030-04-23T19:04:34+00:00");
    }

    #[test]
    fn parses_epoch_expiration() {
        let value = serde_json::json!(1900000000.0);
        let parsed = parse_expiration(&value).unwrap();
        assert_eq!(parsed.timestamp(), 1900000000);
    }

    #[test]
    fn rejects_garbage_expiration() {
        assert!(parse_expiration(&serde_json::json!(null)).is_err());
        assert!(parse_expiration(&serde_json::json!("next tuesday")).is_err());
    }

    #[test]
    fn url_query_profile_wins_over_configured_profile() {
        let endpoint = CodeArtifactEndpoint::parse(
            "https://d-123456789012.d.codeartifact.eu-west-1.amazonaws.com/maven/repo?codeartifact.profile=ci",
        )
        .unwrap();
        let issuer = AwsCliTokenIssuer::new(SystemVarResolver::with_properties(
            [("codeartifact.profile".to_string(), "default".to_string())].into(),
        ));
        assert_eq!(issuer.profile(&endpoint).as_deref(), Some("ci"));
    }

    #[test]
    fn configured_profile_applies_without_query() {
        let endpoint = CodeArtifactEndpoint::parse(
            "https://d-123456789012.d.codeartifact.eu-west-1.amazonaws.com/maven/repo",
        )
        .unwrap();
        let issuer = AwsCliTokenIssuer::new(SystemVarResolver::with_properties(
            [("codeartifact.profile".to_string(), "default".to_string())].into(),
        ));
        assert_eq!(issuer.profile(&endpoint).as_deref(), Some("default"));
    }
}
