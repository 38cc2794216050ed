//! Rate-limit identity key resolution.

use pidima_kernel::gateway::{GatewayRequest, Principal};

/// Key returned when nothing identifies the caller.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Prefix for keys derived from an authenticated subject.
pub const SUBJECT_KEY_PREFIX: &str = "subject:";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Derives the key a rate limiter buckets a request on.
///
/// Resolution never fails and never yields an empty string. In order:
/// authenticated subject, first `X-Forwarded-For` entry, peer address,
/// then [`ANONYMOUS_KEY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, request: &GatewayRequest, principal: Option<&Principal>) -> String {
        if let Some(principal) = principal {
            return format!("{SUBJECT_KEY_PREFIX}{}", principal.subject);
        }

        let forwarded = request
            .header(FORWARDED_FOR)
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|entry| !entry.is_empty());
        if let Some(entry) = forwarded {
            return entry.to_string();
        }

        match request.remote_addr {
            Some(addr) => addr.to_string(),
            None => ANONYMOUS_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidima_kernel::gateway::HttpMethod;
    use std::collections::BTreeSet;
    use std::net::{IpAddr, Ipv4Addr};

    fn request() -> GatewayRequest {
        GatewayRequest::new("r", HttpMethod::Get, "/api/chat")
    }

    #[test]
    fn subject_wins_over_network_hints() {
        let req = request()
            .with_header("x-forwarded-for", "203.0.113.9")
            .with_remote_addr(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let principal = Principal::new("alice", BTreeSet::new());
        assert_eq!(
            IdentityResolver::new().resolve(&req, Some(&principal)),
            "subject:alice"
        );
    }

    #[test]
    fn first_forwarded_entry_is_trimmed() {
        let req = request()
            .with_header("X-Forwarded-For", "  203.0.113.9 , 10.0.0.1")
            .with_remote_addr(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(IdentityResolver::new().resolve(&req, None), "203.0.113.9");
    }

    #[test]
    fn blank_forwarded_entry_falls_through_to_peer() {
        let req = request()
            .with_header("x-forwarded-for", " , 10.0.0.1")
            .with_remote_addr(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
        assert_eq!(IdentityResolver::new().resolve(&req, None), "192.0.2.7");
    }

    #[test]
    fn nothing_known_yields_anonymous() {
        let key = IdentityResolver::new().resolve(&request(), None);
        assert_eq!(key, ANONYMOUS_KEY);
        assert!(!key.is_empty());
    }
}
