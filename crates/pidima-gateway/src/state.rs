//! Shared application state for the gateway server

use crate::auth::CredentialStore;
use crate::pipeline::AdmissionPipeline;
use crate::token::{Clock, TokenIssuer, TokenValidator};
use pidima_kernel::gateway::{Downstream, RateLimiter};
use std::sync::Arc;

/// State shared across all request handlers.
///
/// Everything here is immutable after startup; the limiter owns its own
/// interior state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<TokenValidator>,
    pub credentials: Arc<CredentialStore>,
    pub limiter: Arc<dyn RateLimiter>,
    /// Where `/api/**` goes; `None` answers 502.
    pub downstream: Option<Arc<dyn Downstream>>,
    pub clock: Arc<dyn Clock>,
    /// Add `Secure` to the refresh cookie.
    pub cookie_secure: bool,
}
