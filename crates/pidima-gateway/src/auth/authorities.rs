//! Role claims to capability set.

use pidima_kernel::gateway::{Claims, Principal};
use std::collections::BTreeSet;

/// Prefix applied to every role name.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Maps validated role claims onto capabilities (`USER` -> `ROLE_USER`).
///
/// A missing roles claim yields an authenticated principal with no
/// capabilities, never an error.
#[derive(Debug, Clone)]
pub struct AuthoritiesMapper {
    prefix: String,
}

impl Default for AuthoritiesMapper {
    fn default() -> Self {
        Self::new(ROLE_PREFIX)
    }
}

impl AuthoritiesMapper {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Capability set for `roles`. Blank role names are skipped.
    pub fn capabilities<S: AsRef<str>>(&self, roles: &[S]) -> BTreeSet<String> {
        roles
            .iter()
            .map(|role| role.as_ref().trim())
            .filter(|role| !role.is_empty())
            .map(|role| format!("{}{role}", self.prefix))
            .collect()
    }

    /// Principal reconstructed from validated claims.
    pub fn principal(&self, claims: &Claims) -> Principal {
        Principal::new(claims.sub.clone(), self.capabilities(claims.role_names()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn roles_are_prefixed() {
        let mapper = AuthoritiesMapper::default();
        let caps = mapper.capabilities(&["USER", "ADMIN"]);
        assert!(caps.contains("ROLE_USER"));
        assert!(caps.contains("ROLE_ADMIN"));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn duplicate_and_blank_roles_collapse() {
        let caps = AuthoritiesMapper::default().capabilities(&["USER", "USER", " ", ""]);
        assert_eq!(caps.into_iter().collect::<Vec<_>>(), vec!["ROLE_USER"]);
    }

    #[test]
    fn missing_roles_claim_gives_empty_principal() {
        let c = claims(json!({
            "sub": "alice", "iss": "i", "aud": "a", "iat": 1, "exp": 2
        }));
        let principal = AuthoritiesMapper::default().principal(&c);
        assert_eq!(principal.subject, "alice");
        assert!(principal.capabilities.is_empty());
    }

    #[test]
    fn principal_carries_mapped_roles() {
        let c = claims(json!({
            "sub": "alice", "iss": "i", "aud": "a", "iat": 1, "exp": 2, "roles": ["USER"]
        }));
        let principal = AuthoritiesMapper::default().principal(&c);
        assert!(principal.has_capability("ROLE_USER"));
        assert!(!principal.has_capability("USER"));
    }
}
