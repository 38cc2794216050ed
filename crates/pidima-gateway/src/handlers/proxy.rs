//! Fallback handler: forwards admitted `/api/**` requests downstream.

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;
use axum::{
    Extension,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::Response,
};
use pidima_kernel::gateway::{AdmissionContext, DownstreamError, ForwardRequest, PathPattern};
use std::sync::LazyLock;
use tracing::debug;

static API_PREFIX: LazyLock<Option<PathPattern>> =
    LazyLock::new(|| PathPattern::parse("/api/**").ok());

fn is_api_path(path: &str) -> bool {
    API_PREFIX.as_ref().is_some_and(|p| p.matches(path))
}

/// The admitted (canonical) path with the original query string.
fn forward_target(admitted_path: &str, uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{admitted_path}?{query}"),
        None => admitted_path.to_string(),
    }
}

pub async fn proxy(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdmissionContext>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Response> {
    // Admission decided on the canonical path; forward exactly that one.
    if !is_api_path(&ctx.path) {
        return Err(GatewayError::NotFound(ctx.path.clone()));
    }
    let Some(downstream) = state.downstream.as_ref() else {
        return Err(DownstreamError::NotConfigured(ctx.path.clone()).into());
    };

    let request = ForwardRequest {
        method: ctx.method.clone(),
        path_and_query: forward_target(&ctx.path, &uri),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: body.to_vec(),
    };

    let upstream = downstream.forward(request, &ctx).await?;
    debug!(
        request_id = %ctx.request_id,
        downstream = downstream.name(),
        status = upstream.status,
        "downstream responded"
    );

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    for (name, value) in upstream.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            response.headers_mut().append(name, value);
        }
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_api_subtree_is_forwarded() {
        assert!(is_api_path("/api/chat/session"));
        assert!(is_api_path("/api"));
        assert!(!is_api_path("/apix"));
        assert!(!is_api_path("/me"));
        assert!(!is_api_path("/api/../me"));
    }

    #[test]
    fn forward_target_keeps_the_query() {
        let uri: Uri = "/api//chat/%2e/history?limit=20".parse().unwrap();
        assert_eq!(forward_target("/api/chat/history", &uri), "/api/chat/history?limit=20");

        let uri: Uri = "/api/chat".parse().unwrap();
        assert_eq!(forward_target("/api/chat", &uri), "/api/chat");
    }
}
