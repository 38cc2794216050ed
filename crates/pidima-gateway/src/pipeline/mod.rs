//! Admission pipeline.
//!
//! A fixed-order state machine run once per request:
//!
//! ```text
//! START ─► CORS_CHECKED ─► AUTH_ATTEMPTED ─► IDENTITY_RESOLVED ─► AUTHORIZED
//! ```
//!
//! Preflight requests stop after CORS. A token failure stops at
//! `AUTH_ATTEMPTED` (401) and a missing capability at `IDENTITY_RESOLVED`
//! (403). Every stage is pure in-memory work plus a clock read.

pub mod cors;

use crate::auth::{AuthoritiesMapper, IdentityResolver};
use crate::token::TokenValidator;
use pidima_kernel::gateway::{
    AccessPolicy, AdmissionContext, AdmissionDecision, AdmissionOutcome, AdmissionStage,
    AuthError, GatewayRequest, ResponseHeaders, TokenKind,
};
use tracing::{debug, warn};

/// Runs admission for one request at a time; shared across requests.
#[derive(Debug, Clone)]
pub struct AdmissionPipeline {
    validator: TokenValidator,
    mapper: AuthoritiesMapper,
    resolver: IdentityResolver,
    policy: AccessPolicy,
}

impl AdmissionPipeline {
    pub fn new(
        validator: TokenValidator,
        mapper: AuthoritiesMapper,
        resolver: IdentityResolver,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            validator,
            mapper,
            resolver,
            policy,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Run every stage on `request` and return the decision.
    pub fn admit(&self, request: &GatewayRequest) -> AdmissionDecision {
        let origin = request.non_blank_header("origin").map(str::to_string);
        let mut ctx = AdmissionContext::new(
            request.id.clone(),
            request.method.clone(),
            request.path.clone(),
            origin,
        );
        let response_headers = cors::headers_for(ctx.origin.as_deref());

        // ── START ────────────────────────────────────────────────────────────
        if request.method.is_preflight() {
            ctx.advance(AdmissionStage::CorsChecked);
            ctx.outcome = AdmissionOutcome::Preflight;
            debug!(request_id = %ctx.request_id, path = %ctx.path, "preflight answered");
            return AdmissionDecision {
                context: ctx,
                response_headers,
            };
        }
        ctx.advance(AdmissionStage::CorsChecked);

        // ── CORS_CHECKED → AUTH_ATTEMPTED ───────────────────────────────────
        let public = self.policy.is_public(&request.path);
        if !public {
            let authenticated = request
                .bearer_token()
                .ok_or(AuthError::MissingCredential)
                .and_then(|token| self.validator.parse(token, TokenKind::Access));
            match authenticated {
                Ok(claims) => ctx.principal = Some(self.mapper.principal(&claims)),
                Err(err) => return self.rejected(ctx, err, response_headers),
            }
        }
        ctx.advance(AdmissionStage::AuthAttempted);

        // ── AUTH_ATTEMPTED → IDENTITY_RESOLVED ──────────────────────────────
        ctx.identity_key = Some(self.resolver.resolve(request, ctx.principal.as_ref()));
        ctx.advance(AdmissionStage::IdentityResolved);

        // ── IDENTITY_RESOLVED → AUTHORIZED | REJECTED ───────────────────────
        if !public {
            if let Some(required) = self.policy.required_capability(&request.path) {
                let held = ctx
                    .principal
                    .as_ref()
                    .is_some_and(|p| p.has_capability(required));
                if !held {
                    return self.rejected(ctx, AuthError::InsufficientCapability, response_headers);
                }
            }
        }

        ctx.advance(AdmissionStage::Authorized);
        ctx.outcome = AdmissionOutcome::Authorized;
        debug!(
            request_id = %ctx.request_id,
            path = %ctx.path,
            subject = ?ctx.subject(),
            identity = ?ctx.identity_key,
            "request admitted"
        );
        AdmissionDecision {
            context: ctx,
            response_headers,
        }
    }

    fn rejected(
        &self,
        mut ctx: AdmissionContext,
        err: AuthError,
        response_headers: ResponseHeaders,
    ) -> AdmissionDecision {
        warn!(
            request_id = %ctx.request_id,
            method = ctx.method.as_str(),
            path = %ctx.path,
            stage = ?ctx.stage,
            code = err.code(),
            "request rejected"
        );
        ctx.reject(err);
        AdmissionDecision {
            context: ctx,
            response_headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{ManualClock, SigningKey, TokenIssuer, roles_claim};
    use pidima_kernel::gateway::{CapabilityRule, GatewayConfig, HttpMethod, PathPattern};
    use serde_json::Map;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct Fixture {
        clock: Arc<ManualClock>,
        issuer: TokenIssuer,
        pipeline: AdmissionPipeline,
    }

    fn fixture() -> Fixture {
        let config = GatewayConfig::with_secret(SECRET);
        let clock = Arc::new(ManualClock::new(10_000));
        let key = Arc::new(SigningKey::from_config(&config).unwrap());
        let issuer = TokenIssuer::new(key.clone(), &config.jwt.issuer, &config.jwt.audience, clock.clone());
        let validator =
            TokenValidator::new(key, &config.jwt.issuer, &config.jwt.audience, clock.clone());
        let policy = AccessPolicy::new(
            [],
            vec![
                CapabilityRule::new(PathPattern::parse("/me").unwrap(), "ROLE_USER"),
                CapabilityRule::new(PathPattern::parse("/api/admin/**").unwrap(), "ROLE_ADMIN"),
            ],
        );
        Fixture {
            clock,
            issuer,
            pipeline: AdmissionPipeline::new(
                validator,
                AuthoritiesMapper::default(),
                IdentityResolver::new(),
                policy,
            ),
        }
    }

    fn get(path: &str) -> GatewayRequest {
        GatewayRequest::new("req-1", HttpMethod::Get, path)
    }

    fn bearer(req: GatewayRequest, token: &str) -> GatewayRequest {
        req.with_header("authorization", format!("Bearer {token}"))
    }

    #[test]
    fn preflight_short_circuits_regardless_of_path_and_credentials() {
        let f = fixture();
        for path in ["/me", "/api/admin/users", "/health"] {
            let req = GatewayRequest::new("r", HttpMethod::Options, path)
                .with_header("origin", "https://ui.local")
                .with_header("authorization", "Bearer garbage");
            let decision = f.pipeline.admit(&req);
            assert!(decision.is_preflight(), "{path}");
            assert_eq!(decision.context.identity_key, None);
            assert_eq!(
                decision.response_headers.get(cors::ALLOW_ORIGIN),
                Some("https://ui.local")
            );
        }
    }

    #[test]
    fn public_path_is_anonymous_with_network_identity() {
        let f = fixture();
        let req = get("/health").with_remote_addr(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        let decision = f.pipeline.admit(&req);
        assert!(decision.is_authorized());
        assert!(decision.context.is_anonymous());
        assert_eq!(decision.context.identity_key.as_deref(), Some("10.0.0.5"));
        assert_eq!(decision.context.stage, AdmissionStage::Authorized);
    }

    #[test]
    fn public_path_ignores_a_bad_token() {
        let f = fixture();
        let decision = f.pipeline.admit(&bearer(get("/auth/login"), "not.a.token"));
        assert!(decision.is_authorized());
        assert!(decision.context.is_anonymous());
    }

    #[test]
    fn protected_path_without_token_is_unauthorized() {
        let f = fixture();
        let decision = f.pipeline.admit(&get("/api/chat/session"));
        assert_eq!(decision.rejection(), Some(AuthError::MissingCredential));
        assert_eq!(decision.context.stage, AdmissionStage::Rejected);
        assert_eq!(decision.context.identity_key, None);
        assert_eq!(decision.response_headers.get(cors::ALLOW_ORIGIN), Some("*"));
    }

    #[test]
    fn valid_token_resolves_subject_identity() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access("alice", roles_claim(&["USER"]), 900)
            .unwrap();
        let decision = f.pipeline.admit(&bearer(get("/me"), &token));
        assert!(decision.is_authorized());
        assert_eq!(decision.context.subject(), Some("alice"));
        assert_eq!(decision.context.identity_key.as_deref(), Some("subject:alice"));
        assert!(decision.context.capabilities().contains("ROLE_USER"));
    }

    #[test]
    fn missing_capability_is_forbidden() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access("alice", roles_claim(&["USER"]), 900)
            .unwrap();
        let decision = f.pipeline.admit(&bearer(get("/api/admin/users"), &token));
        assert_eq!(decision.rejection(), Some(AuthError::InsufficientCapability));
        assert_eq!(decision.rejection().map(|e| e.status()), Some(403));
        assert_eq!(decision.context.identity_key.as_deref(), Some("subject:alice"));
    }

    #[test]
    fn encoded_dot_segments_and_empty_segments_still_hit_the_gate() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access("alice", roles_claim(&["USER"]), 900)
            .unwrap();
        for path in [
            "/api/x/%2e%2e/admin/users",
            "/api/x/%2E%2E/admin/users",
            "/api//admin/users",
            "/api/./admin/users/",
        ] {
            let decision = f.pipeline.admit(&bearer(get(path), &token));
            assert_eq!(
                decision.rejection(),
                Some(AuthError::InsufficientCapability),
                "{path}"
            );
            assert_eq!(decision.context.path, "/api/admin/users", "{path}");
        }
    }

    #[test]
    fn roleless_token_is_authenticated_but_holds_nothing() {
        let f = fixture();
        let token = f.issuer.issue_access("bob", Map::new(), 900).unwrap();
        assert!(f.pipeline.admit(&bearer(get("/api/chat"), &token)).is_authorized());
        assert_eq!(
            f.pipeline.admit(&bearer(get("/me"), &token)).rejection(),
            Some(AuthError::InsufficientCapability)
        );
    }

    #[test]
    fn refresh_token_as_bearer_is_wrong_type() {
        let f = fixture();
        let token = f.issuer.issue_refresh("alice", 900).unwrap();
        let decision = f.pipeline.admit(&bearer(get("/api/chat"), &token));
        assert_eq!(decision.rejection(), Some(AuthError::WrongTokenType));
    }

    #[test]
    fn expired_token_is_rejected() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access("alice", roles_claim(&["USER"]), 900)
            .unwrap();
        f.clock.advance(900);
        let decision = f.pipeline.admit(&bearer(get("/me"), &token));
        assert_eq!(decision.rejection(), Some(AuthError::Expired));
    }
}
