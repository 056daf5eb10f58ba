//! JWT access/refresh token issuance and validation.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Which half of a [`TokenPair`] a JWT is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
    pub typ: TokenKind,
}

/// Access + refresh token pair returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issues and validates signed tokens for a user id.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: Uuid) -> Result<TokenPair, AuthError>;

    /// Validate an access token and return its subject.
    fn validate(&self, token: &str) -> Result<Uuid, AuthError>;

    /// Validate a refresh token and return its subject.
    fn validate_refresh(&self, token: &str) -> Result<Uuid, AuthError>;
}

/// EdDSA (Ed25519) JWT signer.
///
/// Keys are parsed once at construction and stay fixed for the life of
/// the signer; rotating them means building a new one.
#[derive(Clone)]
pub struct JwtSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_lifetime_secs: u64,
    refresh_lifetime_secs: u64,
}

impl JwtSigner {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;
        let decoding_key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            issuer: config.jwt_issuer.clone(),
            access_lifetime_secs: config.access_token_lifetime_secs,
            refresh_lifetime_secs: config.refresh_token_lifetime_secs,
        })
    }

    fn sign(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        now: i64,
        lifetime_secs: u64,
    ) -> Result<(String, i64), AuthError> {
        let exp = now + lifetime_secs as i64;
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };

        let header = Header::new(Algorithm::EdDSA);
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;
        Ok((token, exp))
    }

    /// Decode and verify a token (signature, expiry, issuer).
    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        validation.leeway = 0;

        jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }

    fn subject_of(&self, token: &str, expected: TokenKind) -> Result<Uuid, AuthError> {
        let claims = self.decode(token)?;
        if claims.typ != expected {
            return Err(AuthError::TokenInvalid(format!(
                "expected {expected:?} token, got {:?}",
                claims.typ
            )));
        }
        Uuid::parse_str(&claims.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }
}

impl TokenIssuer for JwtSigner {
    fn issue(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let now = Utc::now().timestamp();
        let (access_token, access_exp) =
            self.sign(user_id, TokenKind::Access, now, self.access_lifetime_secs)?;
        let (refresh_token, refresh_exp) =
            self.sign(user_id, TokenKind::Refresh, now, self.refresh_lifetime_secs)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at: timestamp(access_exp)?,
            expires_in: self.access_lifetime_secs,
            refresh_expires_at: timestamp(refresh_exp)?,
        })
    }

    fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        self.subject_of(token, TokenKind::Access)
    }

    fn validate_refresh(&self, token: &str) -> Result<Uuid, AuthError> {
        self.subject_of(token, TokenKind::Refresh)
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AuthError::Crypto(format!("timestamp out of range: {secs}")))
}
