//! Authentication error types.

use idhub_core::error::IdHubError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for IdHubError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => IdHubError::InvalidCredentials,
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => IdHubError::InvalidToken {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => IdHubError::Crypto(msg),
        }
    }
}
