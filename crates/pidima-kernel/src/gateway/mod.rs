//! Admission gateway kernel contract.
//!
//! This module defines the *types, traits and configuration* for the Pidima
//! admission gateway. No concrete implementations live here; token signing,
//! the pipeline and the HTTP server belong in `pidima-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              pidima-kernel  (this module)                   │
//! │  Claims / Audience / Principal   AccessPolicy               │
//! │  AdmissionStage / Context        RateLimiter, Downstream    │
//! │  AuthError taxonomy              GatewayConfig + validate() │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              pidima-gateway  (runtime crate)                │
//! │  TokenIssuer / TokenValidator    AuthoritiesMapper          │
//! │  IdentityResolver                AdmissionPipeline          │
//! │  FixedWindowLimiter              HttpUpstream               │
//! │  GatewayServer  (axum HTTP server)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod admission;
pub mod collaborator;
pub mod error;
pub mod policy;
pub mod principal;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use admission::{AdmissionContext, AdmissionDecision, AdmissionOutcome, AdmissionStage};
pub use collaborator::{
    Downstream, DownstreamError, ForwardRequest, ForwardResponse, RateLimiter,
};
pub use error::{AuthError, GatewayError};
pub use policy::{AccessPolicy, CapabilityRule, PathPattern};
pub use principal::{
    ACCESS_TTL_SECONDS, Audience, Claims, Principal, REFRESH_TTL_SECONDS, REFRESH_TYPE_MARKER,
    TokenKind,
};
pub use validation::{GatewayConfig, RateLimitConfig, UserConfig};

// types module is pub so implementors in pidima-gateway can use the structs
pub mod types;
pub use types::{GatewayRequest, HttpMethod, ResponseHeaders};
