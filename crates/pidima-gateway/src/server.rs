//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the admission pipeline, token services, limiter
//! and downstream into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check, public. |
//! | `POST` | `/auth/login` | Credentials for access token + refresh cookie. |
//! | `POST` | `/auth/refresh` | Rotate the refresh cookie. |
//! | `POST` | `/auth/logout` | Clear the refresh cookie. |
//! | `GET`  | `/me` | The admitted principal (`ROLE_USER`). |
//! | `ANY`  | `/api/**` | Forwarded downstream with the admission context. |

use crate::auth::{AuthoritiesMapper, CredentialStore, IdentityResolver};
use crate::backend::HttpUpstream;
use crate::error::{GatewayError, GatewayResult};
use crate::handlers::{auth, health, me, proxy};
use crate::middleware::FixedWindowLimiter;
use crate::pipeline::{AdmissionPipeline, cors};
use crate::state::AppState;
use crate::token::{self, Clock, SystemClock};
use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pidima_kernel::gateway::{
    Downstream, GatewayConfig, GatewayRequest, HttpMethod, RateLimiter as _, ResponseHeaders,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

/// Response header echoing the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Upper bound on the limiter sweep interval.
const MAX_GC_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// How often idle limiter windows are swept: sixty windows, between one
/// minute and [`MAX_GC_PERIOD`].
fn gc_period(window: Duration) -> Duration {
    window
        .max(Duration::from_secs(1))
        .checked_mul(60)
        .unwrap_or(MAX_GC_PERIOD)
        .min(MAX_GC_PERIOD)
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    downstream: Option<Arc<dyn Downstream>>,
    limiter: Arc<FixedWindowLimiter>,
}

impl GatewayServer {
    /// Create a server from configuration, on the system clock.
    pub fn new(config: GatewayConfig) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
        Self {
            config,
            clock: Arc::new(SystemClock),
            downstream: None,
            limiter,
        }
    }

    /// Builder: replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder: use `downstream` for `/api/**` instead of `upstream.base_url`.
    pub fn with_downstream(mut self, downstream: Arc<dyn Downstream>) -> Self {
        self.downstream = Some(downstream);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validate the config and build the shared state.
    ///
    /// # Errors
    ///
    /// Invalid configuration (including a missing or weak signing secret) or
    /// an HTTP client that cannot be built.
    pub fn build_state(&self) -> GatewayResult<AppState> {
        self.config.validate()?;

        let (issuer, validator) = token::from_config(&self.config, self.clock.clone())?;
        let pipeline = AdmissionPipeline::new(
            validator.clone(),
            AuthoritiesMapper::default(),
            IdentityResolver::new(),
            self.config.access.policy(),
        );

        let downstream = match (&self.downstream, &self.config.upstream.base_url) {
            (Some(downstream), _) => Some(downstream.clone()),
            (None, Some(url)) => {
                Some(Arc::new(HttpUpstream::new("upstream", url)?) as Arc<dyn Downstream>)
            }
            (None, None) => None,
        };

        Ok(AppState {
            pipeline: Arc::new(pipeline),
            issuer: Arc::new(issuer),
            validator: Arc::new(validator),
            credentials: Arc::new(CredentialStore::from_users(&self.config.users)),
            limiter: self.limiter.clone(),
            downstream,
            clock: self.clock.clone(),
            cookie_secure: self.config.cookie.secure,
        })
    }

    /// Build the axum [`Router`].
    pub fn build_app(&self) -> GatewayResult<Router> {
        let state = self.build_state()?;
        Ok(Router::new()
            .route("/health", get(health::health))
            .route("/auth/login", post(auth::login))
            .route("/auth/refresh", post(auth::refresh))
            .route("/auth/logout", post(auth::logout))
            .route("/me", get(me::me))
            .fallback(proxy::proxy)
            .layer(axum_middleware::from_fn_with_state(state.clone(), admission))
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }

    /// Bind to `0.0.0.0:{port}` and serve until the process exits.
    pub async fn start(self) -> GatewayResult<()> {
        let app = self.build_app()?;

        let limiter = self.limiter.clone();
        let period = gc_period(limiter.window());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                limiter.gc();
            }
        });

        let addr = format!("0.0.0.0:{}", self.config.port);
        info!(
            addr = %addr,
            issuer = %self.config.jwt.issuer,
            audience = %self.config.jwt.audience,
            users = self.config.users.len(),
            upstream = ?self.config.upstream.base_url,
            "Pidima gateway starting"
        );
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Admission middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Runs [`AdmissionPipeline`] in front of every route.
///
/// Preflight is answered here; rejections and rate-limit denials never
/// reach a handler. Admitted requests carry their `AdmissionContext` as a
/// request extension.
async fn admission(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let Some(method) = HttpMethod::from_str_ci(req.method().as_str()) else {
        let origin = req
            .headers()
            .get(axum::http::header::ORIGIN)
            .and_then(|v| v.to_str().ok());
        let cors_headers = cors::headers_for(origin);
        let mut response =
            GatewayError::MethodNotAllowed(req.method().to_string()).into_response();
        apply_headers(&mut response, &cors_headers, &request_id);
        return response;
    };

    let mut gateway_req = GatewayRequest::new(&request_id, method, req.uri().path());
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            gateway_req = gateway_req.with_header(name.as_str(), v);
        }
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        gateway_req = gateway_req.with_remote_addr(addr.ip());
    }

    let decision = state.pipeline.admit(&gateway_req);

    let mut response = if decision.is_preflight() {
        StatusCode::OK.into_response()
    } else if let Some(err) = decision.rejection() {
        GatewayError::Auth(err).into_response()
    } else {
        let identity = decision.context.identity_key.as_deref().unwrap_or_default();
        if state.limiter.check(identity).await {
            req.extensions_mut().insert(decision.context.clone());
            next.run(req).await
        } else {
            warn!(
                request_id = %request_id,
                identity = %identity,
                limiter = state.limiter.name(),
                "rate limit exceeded"
            );
            GatewayError::RateLimited.into_response()
        }
    };

    apply_headers(&mut response, &decision.response_headers, &request_id);
    response
}

fn apply_headers(response: &mut Response, headers: &ResponseHeaders, request_id: &str) {
    let target = response.headers_mut();
    for (name, value) in headers.iter() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                target.insert(name, value);
            }
            _ => warn!(
                request_id = %request_id,
                header = %name,
                "dropping unwritable response header"
            ),
        }
    }
    if let Ok(value) = HeaderValue::from_str(request_id) {
        target.insert(REQUEST_ID_HEADER, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gc_period_is_bounded() {
        assert_eq!(gc_period(Duration::ZERO), Duration::from_secs(60));
        assert_eq!(gc_period(Duration::from_secs(1)), Duration::from_secs(60));
        assert_eq!(gc_period(Duration::from_secs(30)), Duration::from_secs(1800));
        assert_eq!(gc_period(Duration::from_secs(u64::MAX)), MAX_GC_PERIOD);
        assert_eq!(gc_period(Duration::MAX), MAX_GC_PERIOD);
    }
}
