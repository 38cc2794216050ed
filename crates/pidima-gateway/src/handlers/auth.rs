//! Login, refresh and logout boundaries.
//!
//! POST /auth/login   - exchange credentials for an access token + refresh cookie
//! POST /auth/refresh - rotate the refresh cookie and mint a new access token
//! POST /auth/logout  - clear the refresh cookie
//!
//! A rotated-out refresh token stays valid until its own expiry; nothing
//! records which refresh tokens have been used.

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;
use crate::token::roles_claim;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use pidima_kernel::gateway::{ACCESS_TTL_SECONDS, REFRESH_TTL_SECONDS, TokenKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

/// Name of the refresh-token cookie.
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub sub: String,
}

/// `Set-Cookie` value for the refresh cookie.
///
/// `max_age == 0` clears the cookie. `Expires` is derived from `now` so
/// clients that ignore `Max-Age` agree on the lifetime.
pub fn refresh_cookie(value: &str, max_age: i64, now: i64, secure: bool) -> String {
    let expires = DateTime::<Utc>::from_timestamp(now.saturating_add(max_age), 0)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "{REFRESH_COOKIE}={value}; Path=/; Max-Age={max_age}; Expires={expires}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Mint an access/refresh pair for `subject` and build the response.
fn token_response(state: &AppState, subject: &str, roles: &[String]) -> GatewayResult<Response> {
    let issue_failed = |e: crate::token::IssueError| GatewayError::Internal(e.to_string());
    let access_token = state
        .issuer
        .issue_access(subject, roles_claim(roles), ACCESS_TTL_SECONDS)
        .map_err(issue_failed)?;
    let refresh_token = state
        .issuer
        .issue_refresh(subject, REFRESH_TTL_SECONDS)
        .map_err(issue_failed)?;

    let cookie = refresh_cookie(
        &refresh_token,
        REFRESH_TTL_SECONDS,
        state.clock.now(),
        state.cookie_secure,
    );
    let body = TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TTL_SECONDS,
        sub: subject.to_string(),
    };
    set_cookie(Json(body).into_response(), &cookie)
}

fn set_cookie(mut response: Response, cookie: &str) -> GatewayResult<Response> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| GatewayError::Internal(format!("invalid cookie header: {e}")))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> GatewayResult<Response> {
    let Json(request) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let Some(roles) = state
        .credentials
        .authenticate(&request.username, &request.password)
    else {
        warn!(username = %request.username, "login refused");
        return Err(GatewayError::InvalidCredentials);
    };

    info!(subject = %request.username, "login succeeded");
    token_response(&state, &request.username, roles)
}

/// POST /auth/refresh
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> GatewayResult<Response> {
    let token = cookie_value(&headers, REFRESH_COOKIE)
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingRefreshToken)?;

    let claims = state
        .validator
        .parse(token, TokenKind::Refresh)
        .map_err(|err| {
            warn!(code = err.code(), "refresh refused");
            GatewayError::InvalidRefreshToken
        })?;

    // Roles come from the current user entry, not the old token.
    let roles = state
        .credentials
        .roles_of(&claims.sub)
        .map(<[String]>::to_vec)
        .unwrap_or_default();

    info!(subject = %claims.sub, "refresh token rotated");
    token_response(&state, &claims.sub, &roles)
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> GatewayResult<Response> {
    let cookie = refresh_cookie("", 0, state.clock.now(), state.cookie_secure);
    set_cookie(Json(json!({ "ok": true })).into_response(), &cookie)
}
