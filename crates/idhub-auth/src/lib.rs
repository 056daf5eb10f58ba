//! idhub Auth: identity orchestration (signup, sign-in, OAuth
//! linking, email change), JWT issuance/validation, password hashing
//! and verification-code transactions.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod password;
pub mod service;
pub mod token;
pub mod user_service;
pub mod validation;
pub mod verification;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthOutput, AuthService, OAuthUserInfo};
pub use token::{AccessTokenClaims, JwtSigner, TokenIssuer, TokenPair};
pub use user_service::UserService;
pub use verification::{LocalVerificationStore, VerificationConfig};
