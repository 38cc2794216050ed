//! Process-wide HS256 signing key.
//!
//! The key is derived once from configuration at startup and never mutated;
//! rotating it means restarting the process. Encoding and decoding go through
//! `jsonwebtoken`; this layer only checks the compact form and the signature.
//! Claim semantics are left to the validator.

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pidima_kernel::gateway::{AuthError, GatewayConfig, GatewayError};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// The only accepted `alg`.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Immutable HS256 key material.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SigningKey {
    /// Build the key from validated configuration.
    ///
    /// # Errors
    ///
    /// Missing or short secrets are rejected here so the process refuses to
    /// start instead of running with an unusable key.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let secret = config.signing_secret()?;
        let bytes = secret.expose_secret().as_bytes();

        // Only the signature and the HS256 header are checked here.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        })
    }

    /// Sign `claims` as a compact HS256 token.
    ///
    /// # Errors
    ///
    /// Fails only if `claims` cannot be serialized.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(ALGORITHM), claims, &self.encoding)
    }

    /// Check the compact form and signature of `token` and deserialize its
    /// payload.
    ///
    /// # Errors
    ///
    /// [`AuthError::SignatureInvalid`] when the signature does not match,
    /// [`AuthError::MalformedToken`] for every structural problem (segment
    /// count, base64url, JSON, an `alg` other than HS256, a payload that does
    /// not fit `T`).
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        jsonwebtoken::decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| auth_error(&err))
    }
}

fn auth_error(err: &JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        _ => AuthError::MalformedToken,
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}
