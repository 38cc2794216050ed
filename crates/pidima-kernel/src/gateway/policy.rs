//! Path-based access policy: the public allow-list and capability gates.

use super::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Paths that skip token validation regardless of configuration.
pub const BUILTIN_PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/actuator/**",
    "/auth/**",
    "/swagger-ui/**",
    "/v3/api-docs/**",
];

// ─────────────────────────────────────────────────────────────────────────────
// PathPattern
// ─────────────────────────────────────────────────────────────────────────────

/// A request path pattern: either an exact path (`/me`) or a subtree
/// (`/auth/**`, which matches `/auth` and everything below it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    base: String,
    subtree: bool,
}

impl PathPattern {
    /// Parse a pattern. Only a trailing `/**` wildcard is supported.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let invalid = |why: &str| GatewayError::InvalidPathPattern(raw.to_string(), why.into());

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        let (base, subtree) = match raw.strip_suffix("/**") {
            Some(base) => (base, true),
            None => (raw, false),
        };
        if base.contains('*') {
            return Err(invalid("'*' is only allowed as a trailing '/**'"));
        }
        let base = if base.is_empty() { "/" } else { base };
        Ok(Self {
            base: base.to_string(),
            subtree,
        })
    }

    /// `true` if `path` falls under this pattern.
    ///
    /// Paths containing `.` or `..` segments never match.
    pub fn matches(&self, path: &str) -> bool {
        if path.split('/').any(|seg| seg == "." || seg == "..") {
            return false;
        }
        if !self.subtree {
            return path == self.base;
        }
        if self.base == "/" {
            return path.starts_with('/');
        }
        path == self.base
            || path
                .strip_prefix(self.base.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.subtree, self.base.as_str()) {
            (true, "/") => f.write_str("/**"),
            (true, base) => write!(f, "{base}/**"),
            (false, base) => f.write_str(base),
        }
    }
}

impl TryFrom<String> for PathPattern {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PathPattern> for String {
    fn from(value: PathPattern) -> Self {
        value.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability rules
// ─────────────────────────────────────────────────────────────────────────────

/// Requires `capability` for every path matched by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRule {
    pub path: PathPattern,
    pub capability: String,
}

impl CapabilityRule {
    pub fn new(path: PathPattern, capability: impl Into<String>) -> Self {
        Self {
            path,
            capability: capability.into(),
        }
    }
}

/// Compiled view of which paths are public and which need a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    public: Vec<PathPattern>,
    rules: Vec<CapabilityRule>,
}

impl AccessPolicy {
    /// Build a policy from the built-in allow-list plus `extra_public`.
    pub fn new(
        extra_public: impl IntoIterator<Item = PathPattern>,
        rules: Vec<CapabilityRule>,
    ) -> Self {
        let mut public: Vec<PathPattern> = BUILTIN_PUBLIC_PATHS
            .iter()
            .filter_map(|p| PathPattern::parse(p).ok())
            .collect();
        public.extend(extra_public);
        Self { public, rules }
    }

    /// `true` if the path skips token validation.
    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|p| p.matches(path))
    }

    /// Capability required by the first matching rule, if any.
    pub fn required_capability(&self, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.path.matches(path))
            .map(|rule| rule.capability.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        let p = pattern("/me");
        assert!(p.matches("/me"));
        assert!(!p.matches("/me/"));
        assert!(!p.matches("/members"));
    }

    #[test]
    fn subtree_pattern_respects_segment_boundary() {
        let p = pattern("/auth/**");
        assert!(p.matches("/auth"));
        assert!(p.matches("/auth/login"));
        assert!(p.matches("/auth/a/b"));
        assert!(!p.matches("/authz"));
        assert!(!p.matches("/api/auth/login"));
    }

    #[test]
    fn dot_segments_never_match() {
        let p = pattern("/auth/**");
        assert!(!p.matches("/auth/../api/chat"));
        assert!(!p.matches("/auth/./login"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(PathPattern::parse("auth/**").is_err());
        assert!(PathPattern::parse("/a/*/b").is_err());
        assert!(PathPattern::parse("/a*").is_err());
    }

    #[test]
    fn display_round_trips() {
        for raw in ["/me", "/auth/**", "/**"] {
            assert_eq!(pattern(raw).to_string(), raw);
        }
    }

    #[test]
    fn builtin_public_paths_are_public() {
        let policy = AccessPolicy::new([], vec![]);
        for path in [
            "/health",
            "/actuator/health",
            "/auth/login",
            "/auth/refresh",
            "/auth/logout",
            "/swagger-ui/index.html",
            "/v3/api-docs/gateway",
        ] {
            assert!(policy.is_public(path), "{path}");
        }
        assert!(!policy.is_public("/api/chat/session"));
        assert!(!policy.is_public("/me"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = AccessPolicy::new(
            [pattern("/status")],
            vec![
                CapabilityRule::new(pattern("/admin/**"), "ROLE_ADMIN"),
                CapabilityRule::new(pattern("/**"), "ROLE_USER"),
            ],
        );
        assert!(policy.is_public("/status"));
        assert_eq!(policy.required_capability("/admin/users"), Some("ROLE_ADMIN"));
        assert_eq!(policy.required_capability("/api/x"), Some("ROLE_USER"));
    }
}
