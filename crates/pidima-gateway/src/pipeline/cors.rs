//! Permissive CORS headers written on every response.

use pidima_kernel::gateway::ResponseHeaders;

pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";
pub const MAX_AGE: &str = "access-control-max-age";
pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
pub const VARY: &str = "vary";

const WILDCARD: &str = "*";
const MAX_AGE_SECONDS: &str = "3600";
const VARY_VALUE: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

/// CORS headers for a request carrying `origin`.
///
/// A present origin is echoed and credentials are allowed; otherwise the
/// origin is `*` and credentials are refused. An origin that cannot be
/// written back as a header value counts as absent.
pub fn headers_for(origin: Option<&str>) -> ResponseHeaders {
    let origin = origin
        .map(str::trim)
        .filter(|o| !o.is_empty() && is_echoable(o));

    let mut headers = ResponseHeaders::new();
    headers.set(ALLOW_ORIGIN, origin.unwrap_or(WILDCARD));
    headers.set(ALLOW_METHODS, WILDCARD);
    headers.set(ALLOW_HEADERS, WILDCARD);
    headers.set(EXPOSE_HEADERS, WILDCARD);
    headers.set(MAX_AGE, MAX_AGE_SECONDS);
    headers.set(VARY, VARY_VALUE);
    headers.set(
        ALLOW_CREDENTIALS,
        if origin.is_some() { "true" } else { "false" },
    );
    headers
}

/// Printable ASCII only, so the echo is always a valid header value.
fn is_echoable(origin: &str) -> bool {
    origin.bytes().all(|b| b == b' ' || b.is_ascii_graphic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_origin_is_echoed_with_credentials() {
        let headers = headers_for(Some("https://app.pidima.local"));
        assert_eq!(headers.get(ALLOW_ORIGIN), Some("https://app.pidima.local"));
        assert_eq!(headers.get(ALLOW_CREDENTIALS), Some("true"));
        assert_eq!(headers.get(MAX_AGE), Some("3600"));
        assert_eq!(headers.get(ALLOW_METHODS), Some("*"));
        assert_eq!(headers.get(ALLOW_HEADERS), Some("*"));
        assert_eq!(headers.get(EXPOSE_HEADERS), Some("*"));
        assert_eq!(
            headers.get(VARY),
            Some("Origin, Access-Control-Request-Method, Access-Control-Request-Headers")
        );
    }

    #[test]
    fn missing_or_blank_origin_is_wildcard_without_credentials() {
        for origin in [None, Some(""), Some("   ")] {
            let headers = headers_for(origin);
            assert_eq!(headers.get(ALLOW_ORIGIN), Some("*"));
            assert_eq!(headers.get(ALLOW_CREDENTIALS), Some("false"));
        }
    }

    #[test]
    fn unechoable_origin_falls_back_to_wildcard() {
        for origin in ["https://ui.local\r\nset-cookie: x=1", "https://ümlaut.local", "a\u{7f}b"] {
            let headers = headers_for(Some(origin));
            assert_eq!(headers.get(ALLOW_ORIGIN), Some("*"), "{origin:?}");
            assert_eq!(headers.get(ALLOW_CREDENTIALS), Some("false"), "{origin:?}");
        }
    }
}
