//! Claim mapping, identity keys and login credentials.

pub mod authorities;
pub mod credentials;
pub mod identity;

pub use authorities::{AuthoritiesMapper, ROLE_PREFIX};
pub use credentials::CredentialStore;
pub use identity::{ANONYMOUS_KEY, IdentityResolver};
