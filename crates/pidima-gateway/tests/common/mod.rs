#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use pidima_gateway::server::GatewayServer;
use pidima_gateway::token::ManualClock;
use pidima_kernel::gateway::{GatewayConfig, UserConfig};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";
/// sha256("admin")
pub const ADMIN_HASH: &str = "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918";
pub const START: i64 = 1_700_000_000;

pub fn config() -> GatewayConfig {
    GatewayConfig::with_secret(SECRET).with_user(UserConfig {
        username: "admin".into(),
        password_sha256: ADMIN_HASH.into(),
        roles: vec!["USER".into()],
    })
}

pub fn server(config: GatewayConfig) -> (GatewayServer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    (GatewayServer::new(config).with_clock(clock.clone()), clock)
}

pub fn app() -> (Router, Arc<ManualClock>) {
    let (server, clock) = server(config());
    (server.build_app().expect("valid config"), clock)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request success")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

pub fn refresh_request(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/auth/refresh");
    if let Some(token) = cookie {
        builder = builder.header("cookie", format!("refresh_token={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get_with_bearer(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Value of the `refresh_token` cookie in a `Set-Cookie` header.
pub fn refresh_cookie(response: &Response<Body>) -> String {
    let header = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    header
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("refresh_token="))
        .expect("refresh_token cookie")
        .to_string()
}

/// Log in as admin and return (access token, refresh token).
pub async fn login(app: &Router) -> (String, String) {
    let response = send(app, login_request("admin", "admin")).await;
    let refresh = refresh_cookie(&response);
    let body = json_body(response).await;
    (body["accessToken"].as_str().unwrap().to_string(), refresh)
}
