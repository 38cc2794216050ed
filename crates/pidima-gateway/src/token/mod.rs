//! Token lifecycle: signing key, issuance and validation.
//!
//! Tokens are HS256 compact JWS strings. The key is built once from
//! [`GatewayConfig`] and shared by the issuer and the validator.

pub mod clock;
pub mod issuer;
pub mod key;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use issuer::{IssueError, TokenIssuer, roles_claim};
pub use key::SigningKey;
pub use validator::TokenValidator;

use pidima_kernel::gateway::{GatewayConfig, GatewayError};
use std::sync::Arc;

/// Build an issuer/validator pair sharing one key and clock.
///
/// # Errors
///
/// Fails when the signing secret is missing or too short.
pub fn from_config(
    config: &GatewayConfig,
    clock: Arc<dyn Clock>,
) -> Result<(TokenIssuer, TokenValidator), GatewayError> {
    let key = Arc::new(SigningKey::from_config(config)?);
    let issuer = TokenIssuer::new(
        key.clone(),
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
        clock.clone(),
    );
    let validator = TokenValidator::new(
        key,
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
        clock,
    );
    Ok((issuer, validator))
}
