//! Login credential store.

use pidima_kernel::gateway::UserConfig;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone)]
struct StoredUser {
    password_sha256: [u8; 32],
    roles: Vec<String>,
}

/// Users allowed to log in, keyed by username.
///
/// Only SHA-256 password digests are held. Lookups for unknown users still
/// hash the supplied password so timing does not reveal which names exist.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, StoredUser>,
}

impl CredentialStore {
    /// Build from validated user entries. Entries with an undecodable hash
    /// are skipped; `GatewayConfig::validate` reports them first.
    pub fn from_users(users: &[UserConfig]) -> Self {
        let users = users
            .iter()
            .filter_map(|user| {
                let mut digest = [0u8; 32];
                hex::decode_to_slice(&user.password_sha256, &mut digest).ok()?;
                Some((
                    user.username.clone(),
                    StoredUser {
                        password_sha256: digest,
                        roles: user.roles.clone(),
                    },
                ))
            })
            .collect();
        Self { users }
    }

    /// Roles of `username` when `password` matches.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&[String]> {
        let supplied = Sha256::digest(password.as_bytes());
        let user = self.users.get(username)?;
        let matches: bool = user.password_sha256.as_slice().ct_eq(supplied.as_slice()).into();
        matches.then_some(user.roles.as_slice())
    }

    /// Current roles of `username`, if the user still exists.
    pub fn roles_of(&self, username: &str) -> Option<&[String]> {
        self.users.get(username).map(|user| user.roles.as_slice())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("admin")
    const ADMIN_HASH: &str = "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918";

    fn store() -> CredentialStore {
        CredentialStore::from_users(&[UserConfig {
            username: "admin".into(),
            password_sha256: ADMIN_HASH.into(),
            roles: vec!["USER".into(), "ADMIN".into()],
        }])
    }

    #[test]
    fn correct_password_returns_roles() {
        let store = store();
        assert_eq!(
            store.authenticate("admin", "admin"),
            Some(&["USER".to_string(), "ADMIN".to_string()][..])
        );
    }

    #[test]
    fn wrong_password_or_user_is_refused() {
        let store = store();
        assert_eq!(store.authenticate("admin", "Admin"), None);
        assert_eq!(store.authenticate("root", "admin"), None);
        assert_eq!(store.authenticate("admin", ""), None);
    }

    #[test]
    fn malformed_hash_entries_are_skipped() {
        let store = CredentialStore::from_users(&[UserConfig {
            username: "bob".into(),
            password_sha256: "zz".into(),
            roles: vec![],
        }]);
        assert!(store.is_empty());
        assert_eq!(store.roles_of("bob"), None);
    }
}
