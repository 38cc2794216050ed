//! Gateway configuration container and startup validation.
//!
//! [`GatewayConfig`] aggregates every knob the gateway reads at startup and
//! exposes a single [`validate()`](GatewayConfig::validate) that checks all
//! invariants *before* any runtime resource (signing key, listener, HTTP
//! client) is created. A config that fails validation must stop the process.

use super::error::GatewayError;
use super::policy::{AccessPolicy, CapabilityRule, PathPattern};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashSet;

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

fn default_port() -> u16 {
    8080
}

fn default_issuer() -> String {
    "http://pidima.local".to_string()
}

fn default_audience() -> String {
    "chatbot".to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Sub-configs
// ─────────────────────────────────────────────────────────────────────────────

/// Token signing and claim expectations.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HS256 secret. Required; there is no built-in default.
    #[serde(default)]
    pub secret: Option<SecretString>,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: default_issuer(),
            audience: default_audience(),
        }
    }
}

/// Refresh-cookie attributes that vary by deployment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieConfig {
    /// Add the `Secure` attribute (enable behind HTTPS).
    #[serde(default)]
    pub secure: bool,
}

/// Public paths and capability gates.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Extra public patterns appended to the built-in allow-list.
    #[serde(default)]
    pub public_paths: Vec<PathPattern>,
    #[serde(default = "AccessConfig::default_rules")]
    pub capability_rules: Vec<CapabilityRule>,
}

impl AccessConfig {
    fn default_rules() -> Vec<CapabilityRule> {
        PathPattern::parse("/me")
            .map(|me| vec![CapabilityRule::new(me, "ROLE_USER")])
            .unwrap_or_default()
    }

    /// Compile into an [`AccessPolicy`].
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.public_paths.clone(), self.capability_rules.clone())
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            public_paths: Vec::new(),
            capability_rules: Self::default_rules(),
        }
    }
}

/// Fixed-window parameters for the in-process limiter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.max_requests == 0 || self.window_secs == 0 {
            return Err(GatewayError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(100, 1)
    }
}

/// Where `/api/**` is forwarded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

/// A login identity.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    /// Hex-encoded SHA-256 of the password.
    pub password_sha256: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            jwt: JwtConfig::default(),
            cookie: CookieConfig::default(),
            access: AccessConfig::default(),
            rate_limit: RateLimitConfig::default(),
            upstream: UpstreamConfig::default(),
            users: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Default config with the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.jwt.secret = Some(SecretString::from(secret.into()));
        config
    }

    /// Builder: add a login identity.
    pub fn with_user(mut self, user: UserConfig) -> Self {
        self.users.push(user);
        self
    }

    /// Builder: set the rate-limit config.
    pub fn with_rate_limit(mut self, rl: RateLimitConfig) -> Self {
        self.rate_limit = rl;
        self
    }

    /// Builder: set the upstream base URL.
    pub fn with_upstream(mut self, base_url: impl Into<String>) -> Self {
        self.upstream.base_url = Some(base_url.into());
        self
    }

    /// The signing secret, if configured and strong enough.
    pub fn signing_secret(&self) -> Result<&SecretString, GatewayError> {
        let secret = self
            .jwt
            .secret
            .as_ref()
            .ok_or(GatewayError::MissingSigningKey)?;
        let actual = secret.expose_secret().len();
        if actual == 0 {
            return Err(GatewayError::MissingSigningKey);
        }
        if actual < MIN_SECRET_BYTES {
            return Err(GatewayError::WeakSigningKey {
                actual,
                required: MIN_SECRET_BYTES,
            });
        }
        Ok(secret)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate all invariants of this configuration.
    ///
    /// Returns the *first* detected [`GatewayError`]. Checks performed
    /// (in order):
    /// 1. Signing secret present and at least [`MIN_SECRET_BYTES`] long.
    /// 2. Issuer and audience non-empty.
    /// 3. Every capability rule names a capability.
    /// 4. Rate-limit quota and window non-zero.
    /// 5. Upstream URL, if set, is http(s).
    /// 6. Usernames non-empty and unique; password hashes are 64 hex chars.
    pub fn validate(&self) -> Result<(), GatewayError> {
        // ── 1. Signing key ───────────────────────────────────────────────────
        self.signing_secret()?;

        // ── 2. Claims ────────────────────────────────────────────────────────
        if self.jwt.issuer.trim().is_empty() {
            return Err(GatewayError::EmptyIssuer);
        }
        if self.jwt.audience.trim().is_empty() {
            return Err(GatewayError::EmptyAudience);
        }

        // ── 3. Capability rules ──────────────────────────────────────────────
        for rule in &self.access.capability_rules {
            if rule.capability.trim().is_empty() {
                return Err(GatewayError::EmptyCapability(rule.path.to_string()));
            }
        }

        // ── 4. Rate limit ────────────────────────────────────────────────────
        self.rate_limit.validate()?;

        // ── 5. Upstream ──────────────────────────────────────────────────────
        if let Some(url) = &self.upstream.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(GatewayError::InvalidUpstream(url.clone()));
            }
        }

        // ── 6. Users ─────────────────────────────────────────────────────────
        let mut seen = HashSet::new();
        for user in &self.users {
            if user.username.trim().is_empty() {
                return Err(GatewayError::EmptyUsername);
            }
            if !seen.insert(user.username.as_str()) {
                return Err(GatewayError::DuplicateUser(user.username.clone()));
            }
            let hash_ok = user.password_sha256.len() == 64
                && hex::decode(&user.password_sha256).is_ok();
            if !hash_ok {
                return Err(GatewayError::InvalidPasswordHash(user.username.clone()));
            }
        }

        Ok(())
    }
}
