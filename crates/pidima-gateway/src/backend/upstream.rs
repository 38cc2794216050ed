//! HTTP downstream for admitted `/api/**` requests.
//!
//! [`HttpUpstream`] relays the request to `{base_url}{path_and_query}` and
//! returns the upstream response verbatim. The admission context travels as
//! `x-auth-*` / `x-identity-key` headers; callers can never supply those
//! themselves.

use async_trait::async_trait;
use pidima_kernel::gateway::collaborator::{context_headers, is_context_header};
use pidima_kernel::gateway::{
    AdmissionContext, Downstream, DownstreamError, ForwardRequest, ForwardResponse, HttpMethod,
};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, instrument};

/// Headers that describe a single hop and are never relayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Proxies admitted requests to one HTTP base URL.
pub struct HttpUpstream {
    name: String,
    base_url: String,
    client: Client,
}

impl HttpUpstream {
    /// Create an upstream for `base_url` (e.g. `http://chatbot:8081`).
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn reqwest_method(method: &HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        // HttpMethod is #[non_exhaustive]
        _ => Method::GET,
    }
}

/// Relayed request headers: hop-by-hop and caller-supplied context headers
/// removed, the admission context appended.
pub fn outbound_headers(
    inbound: &[(String, String)],
    admission: &AdmissionContext,
) -> Vec<(String, String)> {
    inbound
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && !is_context_header(name))
        .cloned()
        .chain(context_headers(admission))
        .collect()
}

#[async_trait]
impl Downstream for HttpUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(upstream = %self.name, request_id = %admission.request_id))]
    async fn forward(
        &self,
        request: ForwardRequest,
        admission: &AdmissionContext,
    ) -> Result<ForwardResponse, DownstreamError> {
        let url = format!("{}{}", self.base_url, request.path_and_query);
        debug!(url = %url, method = request.method.as_str(), "forwarding to upstream");

        let unreachable = |e: reqwest::Error| DownstreamError::Unreachable {
            target: self.name.clone(),
            message: e.to_string(),
        };

        let mut builder = self.client.request(reqwest_method(&request.method), &url);
        for (name, value) in outbound_headers(&request.headers, admission) {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let upstream_resp = builder.send().await.map_err(unreachable)?;
        let status = upstream_resp.status().as_u16();

        let headers = upstream_resp
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = upstream_resp.bytes().await.map_err(unreachable)?;
        debug!(status, bytes = body.len(), "upstream responded");

        Ok(ForwardResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
