//! Token claims and the request-scoped principal.
//!
//! [`Claims`] is the decoded payload of a signed token. [`Principal`] is what
//! admission reconstructs from validated claims on every request; it is never
//! persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Value of the `typ` claim carried by refresh tokens only.
pub const REFRESH_TYPE_MARKER: &str = "refresh";

/// Access-token lifetime in seconds.
pub const ACCESS_TTL_SECONDS: i64 = 15 * 60;

/// Refresh-token lifetime in seconds.
pub const REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

// ─────────────────────────────────────────────────────────────────────────────
// Audience
// ─────────────────────────────────────────────────────────────────────────────

/// The `aud` claim, which raw payloads carry as a string or an array.
///
/// Both shapes collapse into the single [`contains`](Self::contains)
/// membership test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(BTreeSet<String>),
}

impl Audience {
    /// `true` when `expected` equals the single audience or is a member of
    /// the collection.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Multiple(set) => set.contains(expected),
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience::Single(value.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token kind
// ─────────────────────────────────────────────────────────────────────────────

/// Which kind of token a validation call expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Bearer token presented on API requests; carries no type marker.
    Access,
    /// Cookie-borne rotation token; carries `typ = "refresh"`.
    Refresh,
}

impl TokenKind {
    /// `true` when the claim's type marker is the one this kind requires.
    pub fn accepts_marker(self, marker: Option<&str>) -> bool {
        match self {
            TokenKind::Access => marker.is_none(),
            TokenKind::Refresh => marker == Some(REFRESH_TYPE_MARKER),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Claims
// ─────────────────────────────────────────────────────────────────────────────

/// Decoded token payload.
///
/// Registered claims are mandatory: a payload missing any of them does not
/// deserialize. Unknown claims are preserved in [`extra`](Self::extra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience (string or collection).
    pub aud: Audience,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expires-at, epoch seconds.
    pub exp: i64,
    /// Role claim (access tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Type marker (refresh tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Any further claims supplied at issue time.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// The type marker, if any.
    pub fn type_marker(&self) -> Option<&str> {
        self.typ.as_deref()
    }

    /// Role names, empty when the claim is absent.
    pub fn role_names(&self) -> &[String] {
        self.roles.as_deref().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Principal
// ─────────────────────────────────────────────────────────────────────────────

/// An authenticated caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier from the `sub` claim.
    pub subject: String,
    /// Capability names derived from the role claim.
    pub capabilities: BTreeSet<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, capabilities: BTreeSet<String>) -> Self {
        Self {
            subject: subject.into(),
            capabilities,
        }
    }

    /// `true` if the principal holds `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audience_accepts_string_and_array() {
        let single: Audience = serde_json::from_value(json!("chatbot")).unwrap();
        assert!(single.contains("chatbot"));
        assert!(!single.contains("billing"));

        let many: Audience = serde_json::from_value(json!(["billing", "chatbot"])).unwrap();
        assert!(many.contains("chatbot"));
        assert!(!many.contains("admin"));

        let empty: Audience = serde_json::from_value(json!([])).unwrap();
        assert!(!empty.contains("chatbot"));
    }

    #[test]
    fn audience_rejects_other_shapes() {
        assert!(serde_json::from_value::<Audience>(json!(42)).is_err());
        assert!(serde_json::from_value::<Audience>(json!([1, 2])).is_err());
    }

    #[test]
    fn token_kind_markers_are_exclusive() {
        assert!(TokenKind::Access.accepts_marker(None));
        assert!(!TokenKind::Access.accepts_marker(Some("refresh")));
        assert!(TokenKind::Refresh.accepts_marker(Some("refresh")));
        assert!(!TokenKind::Refresh.accepts_marker(None));
        assert!(!TokenKind::Refresh.accepts_marker(Some("access")));
    }

    #[test]
    fn claims_require_registered_fields() {
        let missing_exp = json!({
            "sub": "alice", "iss": "http://pidima.local", "aud": "chatbot", "iat": 1
        });
        assert!(serde_json::from_value::<Claims>(missing_exp).is_err());

        let full = json!({
            "sub": "alice", "iss": "http://pidima.local", "aud": "chatbot",
            "iat": 1, "exp": 2, "tenant": "acme"
        });
        let claims: Claims = serde_json::from_value(full).unwrap();
        assert!(claims.role_names().is_empty());
        assert_eq!(claims.type_marker(), None);
        assert_eq!(claims.extra.get("tenant"), Some(&json!("acme")));
    }
}
