//! Admission state machine vocabulary.
//!
//! ```text
//! START ──► CORS_CHECKED ──► AUTH_ATTEMPTED ──► IDENTITY_RESOLVED ──► AUTHORIZED
//!   │                             │                     │
//!   └── preflight (200)           └──► REJECTED (401)   └──► REJECTED (403)
//! ```
//!
//! The pipeline itself lives in `pidima-gateway`; this module holds the
//! states, the per-request context it fills in, and the decision it returns.

use super::error::AuthError;
use super::principal::Principal;
use super::types::{HttpMethod, ResponseHeaders};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Position of a request in the admission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionStage {
    Start,
    CorsChecked,
    AuthAttempted,
    IdentityResolved,
    Authorized,
    Rejected,
}

impl AdmissionStage {
    /// `true` for `Authorized` and `Rejected`.
    pub fn is_terminal(self) -> bool {
        matches!(self, AdmissionStage::Authorized | AdmissionStage::Rejected)
    }
}

/// How admission ended for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionOutcome {
    /// Still running; never returned from a finished pipeline.
    Pending,
    /// CORS preflight answered directly with success.
    Preflight,
    /// Forward to the downstream with the attached context.
    Authorized,
    /// Refuse with the error's status and code.
    Rejected(AuthError),
}

/// Everything admission learned about one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionContext {
    /// Correlation id of the request.
    pub request_id: String,
    pub method: HttpMethod,
    pub path: String,
    /// `Origin` header, when present and not blank.
    pub origin: Option<String>,
    /// Authenticated principal; `None` means anonymous.
    pub principal: Option<Principal>,
    /// Rate-limit key. `None` only when admission stopped before identity
    /// resolution (preflight or authentication failure).
    pub identity_key: Option<String>,
    /// Last state reached.
    pub stage: AdmissionStage,
    pub outcome: AdmissionOutcome,
}

impl AdmissionContext {
    /// Fresh context in the `Start` state.
    pub fn new(
        request_id: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        origin: Option<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            method,
            path: path.into(),
            origin,
            principal: None,
            identity_key: None,
            stage: AdmissionStage::Start,
            outcome: AdmissionOutcome::Pending,
        }
    }

    /// Subject of the principal, if authenticated.
    pub fn subject(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.subject.as_str())
    }

    /// Capabilities of the principal; empty for anonymous requests.
    pub fn capabilities(&self) -> BTreeSet<String> {
        self.principal
            .as_ref()
            .map(|p| p.capabilities.clone())
            .unwrap_or_default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    /// Move to `stage`.
    pub fn advance(&mut self, stage: AdmissionStage) {
        self.stage = stage;
    }

    /// Terminate with a rejection.
    pub fn reject(&mut self, error: AuthError) {
        self.stage = AdmissionStage::Rejected;
        self.outcome = AdmissionOutcome::Rejected(error);
    }
}

/// Result of running the admission pipeline on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub context: AdmissionContext,
    /// CORS headers to write on whatever response is eventually sent.
    pub response_headers: ResponseHeaders,
}

impl AdmissionDecision {
    pub fn outcome(&self) -> AdmissionOutcome {
        self.context.outcome
    }

    /// The rejection error, if admission refused the request.
    pub fn rejection(&self) -> Option<AuthError> {
        match self.context.outcome {
            AdmissionOutcome::Rejected(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.context.outcome == AdmissionOutcome::Authorized
    }

    pub fn is_preflight(&self) -> bool {
        self.context.outcome == AdmissionOutcome::Preflight
    }
}
