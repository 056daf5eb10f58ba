//! Service wiring over the SurrealDB repositories.

use std::sync::Arc;

use anyhow::{Context, Result};
use idhub_auth::service::AuthService;
use idhub_auth::token::{JwtSigner, TokenIssuer};
use idhub_auth::user_service::UserService;
use idhub_auth::verification::LocalVerificationStore;
use idhub_core::context::RequestContext;
use idhub_db::repository::{
    SurrealUserProfileRepository, SurrealUserProviderRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::publisher::LogEventPublisher;

type Users = SurrealUserRepository<Client>;
type Profiles = SurrealUserProfileRepository<Client>;
type Providers = SurrealUserProviderRepository<Client>;
type Verifier = Arc<LocalVerificationStore>;

pub type Auth = AuthService<Users, Profiles, Providers, Verifier, LogEventPublisher>;
pub type Accounts = UserService<Users, Profiles, Providers, Verifier, LogEventPublisher>;

/// The services a transport layer dispatches into.
pub struct App {
    pub auth: Auth,
    pub accounts: Accounts,
    probe_token: String,
}

impl App {
    pub fn new(db: &Surreal<Client>, config: &ServerConfig) -> Result<Self> {
        let signer = JwtSigner::new(&config.auth).context("Loading JWT signing keys")?;
        let probe_token = signer
            .issue(Uuid::nil())
            .context("Signing probe token")?
            .access_token;
        let verifier = Arc::new(LocalVerificationStore::new(config.verification.clone()));
        let publisher = Arc::new(LogEventPublisher);

        let auth = AuthService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealUserProfileRepository::new(db.clone()),
            SurrealUserProviderRepository::new(db.clone()),
            Arc::clone(&verifier),
            Arc::clone(&publisher),
            signer,
            config.auth.clone(),
        );
        let accounts = UserService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealUserProfileRepository::new(db.clone()),
            SurrealUserProviderRepository::new(db.clone()),
            verifier,
            publisher,
            config.auth.clone(),
        );

        Ok(Self {
            auth,
            accounts,
            probe_token,
        })
    }

    /// Fails if the key pair does not match or storage is unreachable.
    pub async fn readiness(&self, ctx: &RequestContext) -> Result<()> {
        self.auth
            .authenticate(&self.probe_token)
            .context("JWT public key does not match the private key")?;

        match self.accounts.get_me(ctx, Uuid::nil()).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e).context("Storage probe failed"),
        }
    }
}
