//! Server configuration from `IDHUB_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first, if present.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use idhub_auth::config::AuthConfig;
use idhub_auth::verification::VerificationConfig;
use idhub_db::DbConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub verification: VerificationConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        if dotenvy::dotenv().is_ok() {
            tracing::info!("Loaded .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: lookup("IDHUB_DB_URL").unwrap_or(db_defaults.url),
            namespace: lookup("IDHUB_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: lookup("IDHUB_DB_DATABASE").unwrap_or(db_defaults.database),
            username: lookup("IDHUB_DB_USERNAME").unwrap_or(db_defaults.username),
            password: lookup("IDHUB_DB_PASSWORD").unwrap_or(db_defaults.password),
            connect_attempts: parsed(
                &lookup,
                "IDHUB_DB_CONNECT_ATTEMPTS",
                db_defaults.connect_attempts,
            )?,
            connect_backoff: Duration::from_millis(parsed(
                &lookup,
                "IDHUB_DB_CONNECT_BACKOFF_MS",
                db_defaults.connect_backoff.as_millis() as u64,
            )?),
        };

        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_private_key_pem: pem(&lookup, "IDHUB_JWT_PRIVATE_KEY")?,
            jwt_public_key_pem: pem(&lookup, "IDHUB_JWT_PUBLIC_KEY")?,
            jwt_issuer: lookup("IDHUB_JWT_ISSUER").unwrap_or(auth_defaults.jwt_issuer),
            access_token_lifetime_secs: parsed(
                &lookup,
                "IDHUB_ACCESS_TOKEN_TTL_SECS",
                auth_defaults.access_token_lifetime_secs,
            )?,
            refresh_token_lifetime_secs: parsed(
                &lookup,
                "IDHUB_REFRESH_TOKEN_TTL_SECS",
                auth_defaults.refresh_token_lifetime_secs,
            )?,
            pepper: lookup("IDHUB_PASSWORD_PEPPER").filter(|p| !p.is_empty()),
            min_password_length: parsed(
                &lookup,
                "IDHUB_MIN_PASSWORD_LENGTH",
                auth_defaults.min_password_length,
            )?,
            event_publish_timeout_ms: parsed(
                &lookup,
                "IDHUB_EVENT_PUBLISH_TIMEOUT_MS",
                auth_defaults.event_publish_timeout_ms,
            )?,
        };

        let verification_defaults = VerificationConfig::default();
        let verification = VerificationConfig {
            code_ttl_secs: parsed(
                &lookup,
                "IDHUB_CODE_TTL_SECS",
                verification_defaults.code_ttl_secs,
            )?,
            max_attempts: parsed(
                &lookup,
                "IDHUB_CODE_MAX_ATTEMPTS",
                verification_defaults.max_attempts,
            )?,
        };
        if verification.max_attempts == 0 {
            bail!("IDHUB_CODE_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            db,
            auth,
            verification,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

/// A PEM key given inline as `KEY` or as a path in `KEY_FILE`.
fn pem(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    if let Some(inline) = lookup(key) {
        return Ok(inline.replace("\\n", "\n"));
    }
    let file_key = format!("{key}_FILE");
    match lookup(&file_key) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Reading {file_key} from {path}")),
        None => bail!("{key} or {file_key} must be set"),
    }
}
