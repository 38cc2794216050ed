//! Token validation.
//!
//! Checks run in a fixed order and stop at the first failure, cheapest first:
//!
//! 1. structural decode (segments, base64url, HS256 header)
//! 2. signature, then the registered claims
//! 3. issuer
//! 4. audience
//! 5. expiry (`exp > now`)
//! 6. type marker for the calling context

use super::clock::Clock;
use super::key::SigningKey;
use pidima_kernel::gateway::{AuthError, Claims, TokenKind};
use std::sync::Arc;
use tracing::debug;

/// Validates tokens minted by a [`TokenIssuer`](super::TokenIssuer) sharing
/// the same key, issuer and audience.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: Arc<SigningKey>,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
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

    /// Parse and validate `token` for use as `kind`.
    ///
    /// # Errors
    ///
    /// Exactly one [`AuthError`] from the token taxonomy, chosen by the first
    /// failing check.
    pub fn parse(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let result = self.check(token, kind);
        if let Err(err) = &result {
            debug!(kind = %kind, code = err.code(), "token rejected");
        }
        result
    }

    fn check(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims: Claims = self.key.verify(token)?;
        if claims.sub.trim().is_empty() || claims.iat >= claims.exp {
            return Err(AuthError::MalformedToken);
        }

        if claims.iss != self.issuer {
            return Err(AuthError::IssuerMismatch);
        }
        if !claims.aud.contains(&self.audience) {
            return Err(AuthError::AudienceMismatch);
        }
        if claims.exp <= self.clock.now() {
            return Err(AuthError::Expired);
        }
        if !kind.accepts_marker(claims.type_marker()) {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }
}
