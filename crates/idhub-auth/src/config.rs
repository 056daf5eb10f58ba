//! Authentication configuration.

use std::time::Duration;

/// Configuration for the identity orchestrator and token signer.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length accepted at signup.
    pub min_password_length: usize,
    /// Upper bound for a single detached event publish
    /// (default: 5000 ms).
    pub event_publish_timeout_ms: u64,
}

impl AuthConfig {
    pub fn event_publish_timeout(&self) -> Duration {
        Duration::from_millis(self.event_publish_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 2_592_000,
            jwt_issuer: "idhub".into(),
            pepper: None,
            min_password_length: 8,
            event_publish_timeout_ms: 5_000,
        }
    }
}
