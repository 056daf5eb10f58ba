//! SurrealDB connection management.
//!
//! The server usually starts alongside its database, so connecting is
//! retried with exponential backoff before giving up.

use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{info, warn};

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Sign-in is skipped when `username` is empty.
    pub username: String,
    pub password: String,
    /// Total connection attempts, including the first (default: 5).
    pub connect_attempts: u32,
    /// Delay before the first retry; doubled after each failure.
    pub connect_backoff: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "idhub".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
            connect_attempts: 5,
            connect_backoff: Duration::from_millis(500),
        }
    }
}

const MAX_BACKOFF: Duration = Duration::from_secs(10);

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Owns the shared SurrealDB client.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect and select the configured namespace and database,
    /// retrying up to `connect_attempts` times.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        let attempts = config.connect_attempts.max(1);
        let mut backoff = config.connect_backoff;
        let mut attempt = 1;

        loop {
            info!(
                url = %config.url,
                namespace = %config.namespace,
                database = %config.database,
                attempt,
                "Connecting to SurrealDB"
            );
            match Self::connect_once(config).await {
                Ok(db) => {
                    info!("Connected to SurrealDB");
                    return Ok(Self { db });
                }
                Err(e) if attempt < attempts => {
                    warn!(error = %e, attempt, retry_in = ?backoff, "SurrealDB connection failed");
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect_once(config: &DbConfig) -> Result<Surreal<Client>, surrealdb::Error> {
        let db = Surreal::new::<Ws>(&config.url).await?;
        if !config.username.is_empty() {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(db)
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
