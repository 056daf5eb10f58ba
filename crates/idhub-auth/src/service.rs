//! Authentication service: signup, sign-in, OAuth linking and token
//! refresh orchestration.

use std::sync::Arc;

use idhub_core::context::RequestContext;
use idhub_core::error::{IdHubError, IdHubResult};
use idhub_core::events::EventPublisher;
use idhub_core::models::event::{USER_CREATED, USER_PROVIDER_LINKED, UserEvent};
use idhub_core::models::profile::CreateUserProfile;
use idhub_core::models::provider::{CreateUserProvider, UpdateUserProvider, UserProvider};
use idhub_core::models::user::{CreateUser, User, normalize_email};
use idhub_core::repository::{UserProfileRepository, UserProviderRepository, UserRepository};
use idhub_core::verification::VerificationClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::dispatch::publish_detached;
use crate::password;
use crate::token::{JwtSigner, TokenIssuer, TokenPair};
use crate::validation;

/// Identity asserted by an OAuth provider callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    pub provider_type: String,
    pub provider_user_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Successful authentication result.
#[derive(Debug, Clone)]
pub struct AuthOutput {
    pub user: User,
    pub tokens: TokenPair,
}

/// Authentication service.
///
/// Generic over its collaborators so that the auth layer has no
/// dependency on the database crate or on a concrete broker. Holds no
/// mutable state of its own; every cross-request guarantee comes from
/// the repositories' uniqueness constraints.
pub struct AuthService<U, F, P, V, E, T = JwtSigner> {
    user_repo: U,
    profile_repo: F,
    provider_repo: P,
    verifier: V,
    publisher: Arc<E>,
    signer: T,
    config: AuthConfig,
}

impl<U, F, P, V, E, T> AuthService<U, F, P, V, E, T>
where
    U: UserRepository,
    F: UserProfileRepository,
    P: UserProviderRepository,
    V: VerificationClient,
    E: EventPublisher + 'static,
    T: TokenIssuer,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: U,
        profile_repo: F,
        provider_repo: P,
        verifier: V,
        publisher: Arc<E>,
        signer: T,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            provider_repo,
            verifier,
            publisher,
            signer,
            config,
        }
    }

    /// Open a signup transaction. No user record exists until the code
    /// is redeemed.
    pub async fn start_signup(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> IdHubResult<String> {
        validation::validate_email(email)?;
        validation::validate_password(password, self.config.min_password_length)?;
        let email = normalize_email(email);

        let transaction_id = ctx
            .run(
                "verification.start_registration",
                self.verifier.start_registration(&email, password),
            )
            .await?;

        info!(
            trace_id = ctx.trace_id(),
            transaction_id = %transaction_id,
            "Signup started"
        );
        Ok(transaction_id)
    }

    /// Redeem a signup transaction and create the account.
    ///
    /// A concurrent registration of the same email is reported as
    /// `Conflict` straight from the user repository's unique index. If
    /// the profile cannot be written the new user row is purged, so a
    /// failed signup leaves no account behind.
    pub async fn verify_signup(
        &self,
        ctx: &RequestContext,
        transaction_id: &str,
        code: &str,
    ) -> IdHubResult<AuthOutput> {
        // 1. Redeem the code.
        let result = ctx
            .run(
                "verification.verify_registration",
                self.verifier.verify_registration(transaction_id, code),
            )
            .await?;
        if !result.valid {
            return Err(IdHubError::verification_failed("code rejected"));
        }
        let plaintext = result
            .password
            .ok_or_else(|| IdHubError::verification_failed("transaction carries no password"))?;

        // 2. Create user + empty profile.
        let pepper = self.config.pepper.clone();
        let password_hash = ctx
            .run("password.hash", async move {
                password::hash_password_blocking(plaintext, pepper)
                    .await
                    .map_err(IdHubError::from)
            })
            .await?;
        let user = ctx
            .run(
                "user.create",
                self.user_repo.create(CreateUser {
                    email: normalize_email(&result.email),
                    password_hash: Some(password_hash),
                }),
            )
            .await
            .inspect_err(|e| {
                if e.is_conflict() {
                    info!(trace_id = ctx.trace_id(), "Signup lost race for email");
                }
            })?;

        if let Err(e) = self.create_profile(ctx, user.id, None).await {
            self.discard_user(ctx, user.id).await;
            return Err(e);
        }

        // 3. Tokens + event.
        let tokens = self.signer.issue(user.id)?;
        self.emit(ctx, USER_CREATED, user.id, Some(user.email.clone()));

        info!(trace_id = ctx.trace_id(), user_id = %user.id, "Signup completed");
        Ok(AuthOutput { user, tokens })
    }

    /// Authenticate with email + password.
    ///
    /// Unknown email, password-less account, inactive account and wrong
    /// password are all reported as `InvalidCredentials`.
    pub async fn sign_in(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> IdHubResult<AuthOutput> {
        let email = normalize_email(email);

        let user = match ctx
            .run("user.get_by_email", self.user_repo.get_by_email(&email))
            .await
        {
            Ok(user) => Some(user),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        // Accounts without a usable hash still pay for one verification.
        let stored_hash = user
            .as_ref()
            .and_then(|u| u.password_hash.clone())
            .filter(|h| !h.is_empty());
        let (attempt, pepper) = (password.to_string(), self.config.pepper.clone());
        let valid = ctx
            .run("password.verify", async move {
                password::verify_password_blocking(attempt, stored_hash, pepper)
                    .await
                    .map_err(IdHubError::from)
            })
            .await?;

        let user = match user {
            Some(user) if valid && user.is_active => user,
            Some(user) => {
                debug!(trace_id = ctx.trace_id(), user_id = %user.id, "Sign-in rejected");
                return Err(IdHubError::InvalidCredentials);
            }
            None => return Err(IdHubError::InvalidCredentials),
        };

        let tokens = self.signer.issue(user.id)?;
        Ok(AuthOutput { user, tokens })
    }

    /// Resolve an OAuth identity to a user, linking or creating as
    /// needed, and issue tokens.
    ///
    /// Lookup order: existing linkage, then an existing user with the
    /// same email, then a brand-new password-less user. Duplicate
    /// callbacks racing each other converge on the same user: whoever
    /// loses a uniqueness race re-reads the winner's row.
    pub async fn handle_oauth_callback(
        &self,
        ctx: &RequestContext,
        info: OAuthUserInfo,
    ) -> IdHubResult<AuthOutput> {
        validation::require_non_empty("provider_type", &info.provider_type)?;
        validation::require_non_empty("provider_user_id", &info.provider_user_id)?;
        validation::validate_email(&info.email)?;
        let email = normalize_email(&info.email);

        let user = match self.find_linked_user(ctx, &info).await? {
            Some(user) => user,
            None => self.link_or_create(ctx, &info, &email).await?,
        };

        if !user.is_active {
            return Err(IdHubError::InvalidCredentials);
        }

        let tokens = self.signer.issue(user.id)?;
        info!(
            trace_id = ctx.trace_id(),
            user_id = %user.id,
            provider_type = %info.provider_type,
            "OAuth sign-in completed"
        );
        Ok(AuthOutput { user, tokens })
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, ctx: &RequestContext, refresh_token: &str) -> IdHubResult<TokenPair> {
        let user_id = self.signer.validate_refresh(refresh_token)?;

        let user = match ctx
            .run("user.get_by_id", self.user_repo.get_by_id(user_id))
            .await
        {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                return Err(IdHubError::InvalidToken {
                    reason: "unknown subject".into(),
                });
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(IdHubError::InvalidToken {
                reason: "account is inactive".into(),
            });
        }

        Ok(self.signer.issue(user.id)?)
    }

    /// Validate an access token and return its user id.
    ///
    /// Stateless: no repository lookup is performed.
    pub fn authenticate(&self, access_token: &str) -> IdHubResult<Uuid> {
        Ok(self.signer.validate(access_token)?)
    }

    async fn find_linked_user(
        &self,
        ctx: &RequestContext,
        info: &OAuthUserInfo,
    ) -> IdHubResult<Option<User>> {
        let link = match ctx
            .run(
                "provider.get_by_provider",
                self.provider_repo
                    .get_by_provider(&info.provider_type, &info.provider_user_id),
            )
            .await
        {
            Ok(link) => link,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        if let Some(metadata) = &info.metadata {
            if *metadata != link.metadata {
                ctx.run(
                    "provider.update",
                    self.provider_repo.update(
                        link.id,
                        UpdateUserProvider {
                            metadata: Some(metadata.clone()),
                        },
                    ),
                )
                .await?;
            }
        }

        match ctx
            .run("user.get_by_id", self.user_repo.get_by_id(link.user_id))
            .await
        {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_not_found() => {
                // The owner was purged after a failed creation; drop the
                // stale link and resolve the identity afresh.
                warn!(
                    trace_id = ctx.trace_id(),
                    user_id = %link.user_id,
                    "Removing provider link to missing user"
                );
                ctx.run("provider.delete", self.provider_repo.delete(link.id))
                    .await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn link_or_create(
        &self,
        ctx: &RequestContext,
        info: &OAuthUserInfo,
        email: &str,
    ) -> IdHubResult<User> {
        let (user, created) = match ctx
            .run("user.get_by_email", self.user_repo.get_by_email(email))
            .await
        {
            Ok(user) => (user, false),
            Err(e) if e.is_not_found() => self.create_oauth_user(ctx, info, email).await?,
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(IdHubError::InvalidCredentials);
        }
        if !created {
            self.ensure_profile(ctx, user.id, info.display_name.clone())
                .await?;
        }

        let owner = self.link_provider(ctx, info, &user).await?;
        if owner != user.id {
            // Another callback linked this identity to a different
            // account first.
            if created {
                warn!(
                    trace_id = ctx.trace_id(),
                    user_id = %user.id,
                    "Discarding orphaned OAuth user"
                );
                if let Err(e) = ctx.run("user.delete", self.user_repo.delete(user.id)).await {
                    warn!(trace_id = ctx.trace_id(), error = %e, "Failed to discard orphaned user");
                }
            }
            return ctx
                .run("user.get_by_id", self.user_repo.get_by_id(owner))
                .await;
        }

        if created {
            self.emit(ctx, USER_CREATED, user.id, Some(user.email.clone()));
        }
        Ok(user)
    }

    /// Returns the created user and whether this call created it.
    async fn create_oauth_user(
        &self,
        ctx: &RequestContext,
        info: &OAuthUserInfo,
        email: &str,
    ) -> IdHubResult<(User, bool)> {
        let created = ctx
            .run(
                "user.create",
                self.user_repo.create(CreateUser {
                    email: email.to_string(),
                    password_hash: None,
                }),
            )
            .await;

        match created {
            Ok(user) => {
                if let Err(e) = self
                    .create_profile(ctx, user.id, info.display_name.clone())
                    .await
                {
                    self.discard_user(ctx, user.id).await;
                    return Err(e);
                }
                Ok((user, true))
            }
            Err(e) if e.is_conflict() => {
                debug!(trace_id = ctx.trace_id(), "User created concurrently, re-reading");
                let user = ctx
                    .run("user.get_by_email", self.user_repo.get_by_email(email))
                    .await?;
                Ok((user, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Link the provider identity to `user`. Returns the id of the user
    /// that owns the linkage afterwards.
    async fn link_provider(
        &self,
        ctx: &RequestContext,
        info: &OAuthUserInfo,
        user: &User,
    ) -> IdHubResult<Uuid> {
        let created = ctx
            .run(
                "provider.create",
                self.provider_repo.create(CreateUserProvider {
                    provider_type: info.provider_type.clone(),
                    provider_user_id: info.provider_user_id.clone(),
                    user_id: user.id,
                    metadata: info.metadata.clone(),
                }),
            )
            .await;

        match created {
            Ok(link) => {
                self.emit(ctx, USER_PROVIDER_LINKED, link.user_id, None);
                Ok(link.user_id)
            }
            Err(e) if e.is_conflict() => {
                debug!(
                    trace_id = ctx.trace_id(),
                    provider_type = %info.provider_type,
                    "Provider linked concurrently, re-reading"
                );
                let existing: UserProvider = ctx
                    .run(
                        "provider.get_by_provider",
                        self.provider_repo
                            .get_by_provider(&info.provider_type, &info.provider_user_id),
                    )
                    .await?;
                Ok(existing.user_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Write the profile for a new user. A profile that already exists
    /// counts as success: a concurrent callback reusing this user may
    /// have written it first.
    async fn create_profile(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        display_name: Option<String>,
    ) -> IdHubResult<()> {
        match ctx
            .run(
                "profile.create",
                self.profile_repo.create(CreateUserProfile {
                    user_id,
                    display_name,
                    avatar_url: None,
                }),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Make sure an existing user has a profile.
    async fn ensure_profile(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        display_name: Option<String>,
    ) -> IdHubResult<()> {
        match ctx
            .run("profile.get_by_user_id", self.profile_repo.get_by_user_id(user_id))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!(trace_id = ctx.trace_id(), user_id = %user_id, "Creating missing profile");
                self.create_profile(ctx, user_id, display_name).await
            }
            Err(e) => Err(e),
        }
    }

    /// Undo a user row whose account creation failed part-way.
    ///
    /// Runs outside `ctx` so a cancelled request still cleans up.
    async fn discard_user(&self, ctx: &RequestContext, user_id: Uuid) {
        warn!(trace_id = ctx.trace_id(), user_id = %user_id, "Purging incomplete user");
        if let Err(e) = self.user_repo.purge(user_id).await {
            warn!(
                trace_id = ctx.trace_id(),
                user_id = %user_id,
                error = %e,
                "Failed to purge incomplete user"
            );
        }
    }

    fn emit(&self, ctx: &RequestContext, event: &str, user_id: Uuid, email: Option<String>) {
        publish_detached(
            &self.publisher,
            UserEvent::new(event, user_id, email, ctx.trace_id()),
            self.config.event_publish_timeout(),
        );
    }
}
