//! Core request/response types for the admission contract.
//!
//! These types are the transport-neutral view of an HTTP exchange that the
//! admission pipeline reads from and writes to. They carry no runtime
//! dependencies beyond `serde` and `std`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the standard verbs seen at the gateway edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// `true` for the CORS preflight method.
    pub fn is_preflight(&self) -> bool {
        matches!(self, HttpMethod::Options)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical form of a request path.
///
/// Percent-escapes of unreserved characters are decoded, empty and `.`
/// segments are dropped, and `..` removes the previous segment (never going
/// above the root). Both `/` and `\` separate segments. The result starts
/// with `/` and has no trailing slash unless it is the root. Other escapes,
/// including `%2F`, stay encoded and belong to their segment.
///
/// ```
/// use pidima_kernel::gateway::types::normalize_path;
///
/// assert_eq!(normalize_path("/api/x/%2e%2E/admin//users/"), "/api/admin/users");
/// ```
pub fn normalize_path(raw: &str) -> String {
    let decoded = decode_unreserved(raw);
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::with_capacity(decoded.len());
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

fn decode_unreserved(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = &rest[pos..];
        let unreserved = escape
            .get(1..3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .filter(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'));
        match unreserved {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &escape[3..];
            }
            None => {
                out.push('%');
                rest = &escape[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// An inbound request as seen by the admission pipeline.
///
/// Only the parts admission needs are captured; the body stays with the
/// transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Canonical request path without the query string, e.g.
    /// `/api/chat/session`. See [`normalize_path`].
    pub path: String,
    /// HTTP headers (names lowercased, first value wins).
    pub headers: BTreeMap<String, String>,
    /// Transport-level peer address, when the transport knows it.
    pub remote_addr: Option<IpAddr>,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, method and path.
    ///
    /// The path is normalized before anything else sees it.
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: normalize_path(&path.into()),
            headers: BTreeMap::new(),
            remote_addr: None,
        }
    }

    /// Builder helper: attach a header. Later duplicates do not overwrite.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(key.into().to_lowercase())
            .or_insert_with(|| value.into());
        self
    }

    /// Builder helper: set the peer address.
    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Look up a header by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Header value if present and not blank.
    pub fn non_blank_header(&self, name: &str) -> Option<&str> {
        self.header(name).filter(|v| !v.trim().is_empty())
    }

    /// Extract the credential from an `Authorization: Bearer <token>` header.
    ///
    /// The scheme is matched case-insensitively; an empty token yields `None`.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header("authorization")?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Read a cookie value from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
    }
}

/// Headers the pipeline wants written onto the eventual response.
///
/// Kept as an ordered list so tests and logs see a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeaders(Vec<(String, String)>);

impl ResponseHeaders {
    /// Empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any earlier value with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Value of a header, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no header is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
