//! Contracts for the collaborators admission hands off to.
//!
//! Neither collaborator is owned by the admission core: the rate limiter
//! buckets on the identity key admission produces, and the downstream
//! receives the admitted request together with its [`AdmissionContext`].

use super::admission::AdmissionContext;
use super::types::HttpMethod;
use async_trait::async_trait;
use thiserror::Error;

/// Header carrying the admitted principal's subject downstream.
pub const SUBJECT_HEADER: &str = "x-auth-subject";
/// Header carrying the comma-separated capability set downstream.
pub const CAPABILITIES_HEADER: &str = "x-auth-capabilities";
/// Header carrying the rate-limit identity key downstream.
pub const IDENTITY_HEADER: &str = "x-identity-key";

/// External rate limiter keyed by the admission identity string.
///
/// The bucketing algorithm is the implementor's business.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    /// Return `true` if a request under `identity_key` may proceed.
    async fn check(&self, identity_key: &str) -> bool;
}

/// A request admitted for forwarding.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: HttpMethod,
    /// Path plus query string, e.g. `/api/chat/history?limit=20`.
    pub path_and_query: String,
    /// Headers to forward (names lowercased; repeated names allowed).
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// What the downstream answered.
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Failure to reach or read from the downstream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DownstreamError {
    #[error("no downstream is configured for '{0}'")]
    NotConfigured(String),

    #[error("downstream '{target}' is unreachable: {message}")]
    Unreachable { target: String, message: String },
}

/// Routing layer that receives admitted requests.
#[async_trait]
pub trait Downstream: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    /// Forward `request`, attaching the admission context.
    async fn forward(
        &self,
        request: ForwardRequest,
        admission: &AdmissionContext,
    ) -> Result<ForwardResponse, DownstreamError>;
}

/// Headers that describe an admitted request to the downstream.
///
/// Anonymous requests carry only the identity header.
pub fn context_headers(admission: &AdmissionContext) -> Vec<(String, String)> {
    let mut headers = Vec::with_capacity(3);
    if let Some(principal) = &admission.principal {
        headers.push((SUBJECT_HEADER.to_string(), principal.subject.clone()));
        let caps: Vec<&str> = principal.capabilities.iter().map(String::as_str).collect();
        headers.push((CAPABILITIES_HEADER.to_string(), caps.join(",")));
    }
    if let Some(key) = &admission.identity_key {
        headers.push((IDENTITY_HEADER.to_string(), key.clone()));
    }
    headers
}

/// `true` for headers that only the gateway may set.
pub fn is_context_header(name: &str) -> bool {
    [SUBJECT_HEADER, CAPABILITIES_HEADER, IDENTITY_HEADER]
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::principal::Principal;
    use std::collections::BTreeSet;

    #[test]
    fn context_headers_for_authenticated_request() {
        let mut ctx = AdmissionContext::new("r", HttpMethod::Get, "/api/x", None);
        let caps: BTreeSet<String> = ["ROLE_ADMIN", "ROLE_USER"].iter().map(|s| s.to_string()).collect();
        ctx.principal = Some(Principal::new("alice", caps));
        ctx.identity_key = Some("subject:alice".into());

        let headers = context_headers(&ctx);
        assert_eq!(
            headers,
            vec![
                (SUBJECT_HEADER.to_string(), "alice".to_string()),
                (CAPABILITIES_HEADER.to_string(), "ROLE_ADMIN,ROLE_USER".to_string()),
                (IDENTITY_HEADER.to_string(), "subject:alice".to_string()),
            ]
        );
    }

    #[test]
    fn anonymous_request_only_carries_identity() {
        let mut ctx = AdmissionContext::new("r", HttpMethod::Get, "/health", None);
        ctx.identity_key = Some("10.0.0.1".into());
        assert_eq!(
            context_headers(&ctx),
            vec![(IDENTITY_HEADER.to_string(), "10.0.0.1".to_string())]
        );
    }

    #[test]
    fn context_header_names_are_case_insensitive() {
        assert!(is_context_header("X-Auth-Subject"));
        assert!(is_context_header("x-identity-key"));
        assert!(!is_context_header("authorization"));
    }
}
