//! Error types for the admission kernel.
//!
//! [`AuthError`] is the request-time taxonomy: every token validation or
//! authorization failure maps to exactly one variant, each with a stable
//! machine-readable code and an HTTP status. [`GatewayError`] covers failures
//! detected while validating configuration, before any listener binds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request-time admission failure.
///
/// Display strings are safe to return to callers: they never include token
/// contents or key material.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthError {
    /// The token is not three base64url segments of well-formed JSON with the
    /// registered claims, or its header names an unsupported algorithm.
    #[error("token is malformed")]
    MalformedToken,

    /// The HMAC over header and payload does not match the signature segment.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The `iss` claim differs from the configured issuer.
    #[error("token issuer does not match")]
    IssuerMismatch,

    /// The `aud` claim neither equals nor contains the configured audience.
    #[error("token audience does not match")]
    AudienceMismatch,

    /// `exp` is at or before the current time.
    #[error("token has expired")]
    Expired,

    /// An access token was presented where a refresh token is required, or
    /// the reverse.
    #[error("token type is not accepted here")]
    WrongTokenType,

    /// No bearer credential was supplied on a protected path.
    #[error("authentication credentials are missing")]
    MissingCredential,

    /// The principal lacks the capability the path requires.
    #[error("principal lacks the required capability")]
    InsufficientCapability,
}

impl AuthError {
    /// Stable machine-readable code returned in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::SignatureInvalid => "invalid_signature",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::Expired => "token_expired",
            AuthError::WrongTokenType => "wrong_token_type",
            AuthError::MissingCredential => "missing_credentials",
            AuthError::InsufficientCapability => "insufficient_capability",
        }
    }

    /// HTTP status: 403 for authorization failures, 401 for the rest.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::InsufficientCapability => 403,
            _ => 401,
        }
    }
}

/// Configuration error type for the gateway kernel.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Signing key ──────────────────────────────────────────────────────────
    /// No signing secret was configured.
    #[error("jwt signing secret is not configured")]
    MissingSigningKey,

    /// The signing secret is shorter than HS256 allows.
    #[error("jwt signing secret is {actual} bytes; at least {required} are required")]
    WeakSigningKey { actual: usize, required: usize },

    // ── Claims ───────────────────────────────────────────────────────────────
    /// The configured issuer is empty or whitespace-only.
    #[error("jwt issuer cannot be empty")]
    EmptyIssuer,

    /// The configured audience is empty or whitespace-only.
    #[error("jwt audience cannot be empty")]
    EmptyAudience,

    // ── Access policy ────────────────────────────────────────────────────────
    /// A path pattern is syntactically invalid.
    #[error("invalid path pattern '{0}': {1}")]
    InvalidPathPattern(String, String),

    /// A capability rule names an empty capability.
    #[error("capability rule for '{0}' has an empty capability")]
    EmptyCapability(String),

    // ── Collaborators ────────────────────────────────────────────────────────
    /// Rate-limit window or quota is zero.
    #[error("rate limit requires max_requests > 0 and window_secs > 0")]
    InvalidRateLimit,

    /// The upstream base URL is not an http(s) URL.
    #[error("upstream base url '{0}' must start with http:// or https://")]
    InvalidUpstream(String),

    // ── Credentials ──────────────────────────────────────────────────────────
    /// A user entry has an empty username.
    #[error("user entry has an empty username")]
    EmptyUsername,

    /// Two user entries share a username.
    #[error("user '{0}' is defined more than once")]
    DuplicateUser(String),

    /// A password hash is not 64 hex characters.
    #[error("user '{0}' has a malformed password_sha256")]
    InvalidPasswordHash(String),
}
