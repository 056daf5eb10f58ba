//! Password hashing and verification using Argon2id.
//!
//! The `*_blocking` variants run on tokio's blocking pool so the
//! memory-hard work stays off the async workers.

use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

/// Verified in place of a stored hash when the account has none, so a
/// missing account costs as much as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("idhub-dummy-password", None).ok());

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters
/// (memory: 19 MiB, iterations: 2, parallelism: 1).
///
/// If a pepper is provided it is prepended to the password. The salt
/// is randomly generated for each call.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    // Parameters are read from the PHC string.
    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(
    password: String,
    pepper: Option<String>,
) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password, pepper.as_deref()))
        .await
        .map_err(|e| AuthError::Crypto(format!("password hash task failed: {e}")))?
}

/// [`verify_password`] on the blocking pool.
///
/// With `hash: None` a dummy hash is verified instead and the result is
/// always `false`.
pub async fn verify_password_blocking(
    password: String,
    hash: Option<String>,
    pepper: Option<String>,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash, pepper.as_deref()),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(&password, dummy, pepper.as_deref());
            }
            Ok(false)
        }
    })
    .await
    .map_err(|e| AuthError::Crypto(format!("password verify task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_argon2id_phc() {
        let hash = hash_password("hunter22", None).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter22"));
    }

    #[test]
    fn correct_password_matches() {
        let hash = hash_password("hunter22", None).unwrap();
        assert!(verify_password("hunter22", &hash, None).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash_password("hunter22", None).unwrap();
        assert!(!verify_password("wrong", &hash, None).unwrap());
    }

    #[test]
    fn pepper_is_applied() {
        let hash = hash_password("hunter22", Some("pepper!")).unwrap();
        assert!(verify_password("hunter22", &hash, Some("pepper!")).unwrap());
        // Without pepper should fail.
        assert!(!verify_password("hunter22", &hash, None).unwrap());
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same", None).unwrap();
        let b = hash_password("same", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_returns_error() {
        let result = verify_password("pw", "not-a-hash", None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn blocking_variants_agree_with_sync_ones() {
        let hash = hash_password_blocking("hunter22".into(), Some("p".into()))
            .await
            .unwrap();
        assert!(verify_password("hunter22", &hash, Some("p")).unwrap());
        assert!(
            verify_password_blocking("hunter22".into(), Some(hash), Some("p".into()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn missing_hash_never_matches() {
        assert!(DUMMY_HASH.is_some());
        let matched = verify_password_blocking("idhub-dummy-password".into(), None, None)
            .await
            .unwrap();
        assert!(!matched);
    }
}
