//! Access and refresh token issuance.

use super::clock::Clock;
use super::key::SigningKey;
use pidima_kernel::gateway::REFRESH_TYPE_MARKER;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Claims the issuer always sets itself; callers cannot override them.
const REGISTERED_CLAIMS: &[&str] = &["sub", "iss", "aud", "iat", "exp", "typ"];

/// Violated issuance precondition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IssueError {
    #[error("token subject cannot be empty")]
    EmptySubject,

    #[error("token ttl must be greater than zero seconds")]
    NonPositiveTtl,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for IssueError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        IssueError::Signing(err.to_string())
    }
}

/// Creates signed tokens for a fixed issuer and audience.
///
/// Output is a pure function of subject, claims, the clock reading and the
/// signing key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(
        key: Arc<SigningKey>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            key,
            issuer: issuer.into(),
            audience: audience.into(),
            clock,
        }
    }

    /// Issue an access token carrying `extra_claims` (typically `roles`).
    ///
    /// A `typ` entry in `extra_claims` is dropped: access tokens never carry
    /// the type marker.
    pub fn issue_access(
        &self,
        subject: &str,
        extra_claims: Map<String, Value>,
        ttl_seconds: i64,
    ) -> Result<String, IssueError> {
        let mut claims = extra_claims;
        claims.retain(|name, _| !REGISTERED_CLAIMS.contains(&name.as_str()));
        self.fill_registered(&mut claims, subject, ttl_seconds)?;
        debug!(subject, ttl_seconds, "issuing access token");
        Ok(self.key.sign(&claims)?)
    }

    /// Issue a refresh token: the registered claims plus `typ = "refresh"`.
    pub fn issue_refresh(&self, subject: &str, ttl_seconds: i64) -> Result<String, IssueError> {
        let mut claims = Map::new();
        self.fill_registered(&mut claims, subject, ttl_seconds)?;
        claims.insert("typ".to_string(), json!(REFRESH_TYPE_MARKER));
        debug!(subject, ttl_seconds, "issuing refresh token");
        Ok(self.key.sign(&claims)?)
    }

    fn fill_registered(
        &self,
        claims: &mut Map<String, Value>,
        subject: &str,
        ttl_seconds: i64,
    ) -> Result<(), IssueError> {
        if subject.trim().is_empty() {
            return Err(IssueError::EmptySubject);
        }
        if ttl_seconds <= 0 {
            return Err(IssueError::NonPositiveTtl);
        }
        let iat = self.clock.now();
        let exp = iat.saturating_add(ttl_seconds);

        claims.insert("sub".to_string(), json!(subject));
        claims.insert("iss".to_string(), json!(self.issuer));
        claims.insert("aud".to_string(), json!(self.audience));
        claims.insert("iat".to_string(), json!(iat));
        claims.insert("exp".to_string(), json!(exp));
        Ok(())
    }
}

/// Build the `roles` extra claim.
pub fn roles_claim<S: AsRef<str>>(roles: &[S]) -> Map<String, Value> {
    let roles: Vec<&str> = roles.iter().map(AsRef::as_ref).collect();
    let mut claims = Map::new();
    claims.insert("roles".to_string(), json!(roles));
    claims
}
