//! User service: profile reads/updates, email change and provider
//! linkage management for an authenticated user.

use std::sync::Arc;

use idhub_core::context::RequestContext;
use idhub_core::error::{IdHubError, IdHubResult};
use idhub_core::events::EventPublisher;
use idhub_core::models::event::{USER_EMAIL_CHANGED, UserEvent};
use idhub_core::models::profile::{UpdateUserProfile, UserProfile};
use idhub_core::models::provider::UserProvider;
use idhub_core::models::user::{UpdateUser, User, normalize_email};
use idhub_core::repository::{UserProfileRepository, UserProviderRepository, UserRepository};
use idhub_core::verification::VerificationClient;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::dispatch::publish_detached;
use crate::validation;

pub struct UserService<U, F, P, V, E> {
    user_repo: U,
    profile_repo: F,
    provider_repo: P,
    verifier: V,
    publisher: Arc<E>,
    config: AuthConfig,
}

impl<U, F, P, V, E> UserService<U, F, P, V, E>
where
    U: UserRepository,
    F: UserProfileRepository,
    P: UserProviderRepository,
    V: VerificationClient,
    E: EventPublisher + 'static,
{
    pub fn new(
        user_repo: U,
        profile_repo: F,
        provider_repo: P,
        verifier: V,
        publisher: Arc<E>,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            provider_repo,
            verifier,
            publisher,
            config,
        }
    }

    pub async fn get_me(&self, ctx: &RequestContext, user_id: Uuid) -> IdHubResult<User> {
        ctx.run("user.get_by_id", self.user_repo.get_by_id(user_id))
            .await
    }

    /// Look up another user. Whether `requester_id` may do so is decided
    /// upstream.
    pub async fn get_by_id(
        &self,
        ctx: &RequestContext,
        requester_id: Uuid,
        target_id: Uuid,
    ) -> IdHubResult<User> {
        tracing::debug!(
            trace_id = ctx.trace_id(),
            requester_id = %requester_id,
            target_id = %target_id,
            "User lookup"
        );
        ctx.run("user.get_by_id", self.user_repo.get_by_id(target_id))
            .await
    }

    pub async fn get_profile(&self, ctx: &RequestContext, user_id: Uuid) -> IdHubResult<UserProfile> {
        ctx.run("profile.get_by_user_id", self.profile_repo.get_by_user_id(user_id))
            .await
    }

    /// Partial profile update: only fields present in `update` are
    /// written.
    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        update: UpdateUserProfile,
    ) -> IdHubResult<UserProfile> {
        let profile = self.get_profile(ctx, user_id).await?;
        if update.is_empty() {
            return Ok(profile);
        }

        ctx.run("profile.update", self.profile_repo.update(user_id, update))
            .await
    }

    /// Open an email-change transaction. Nothing is persisted yet.
    pub async fn start_email_change(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        new_email: &str,
    ) -> IdHubResult<String> {
        validation::validate_new_email(new_email)?;
        let new_email = normalize_email(new_email);

        let transaction_id = ctx
            .run(
                "verification.start_email_change",
                self.verifier.start_email_change(user_id, &new_email),
            )
            .await?;

        info!(
            trace_id = ctx.trace_id(),
            user_id = %user_id,
            transaction_id = %transaction_id,
            "Email change started"
        );
        Ok(transaction_id)
    }

    /// Redeem an email-change transaction and store the new address.
    ///
    /// Redeeming to the address the user already has is an error
    /// (`Unchanged`) and leaves the record as it was.
    pub async fn verify_email_change(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        transaction_id: &str,
        code: &str,
    ) -> IdHubResult<User> {
        let result = ctx
            .run(
                "verification.verify_email_change",
                self.verifier.verify_email_change(transaction_id, code),
            )
            .await?;
        if !result.valid {
            return Err(IdHubError::verification_failed("code rejected"));
        }
        if result.user_id.is_some_and(|owner| owner != user_id) {
            return Err(IdHubError::verification_failed(
                "transaction was opened by another user",
            ));
        }

        let user = ctx
            .run("user.get_by_id", self.user_repo.get_by_id(user_id))
            .await?;
        let new_email = normalize_email(&result.email);
        if user.email == new_email {
            return Err(IdHubError::Unchanged {
                field: "email".into(),
            });
        }

        let updated = ctx
            .run(
                "user.update",
                self.user_repo.update(
                    user_id,
                    UpdateUser {
                        email: Some(new_email),
                        ..Default::default()
                    },
                ),
            )
            .await?;

        publish_detached(
            &self.publisher,
            UserEvent::new(
                USER_EMAIL_CHANGED,
                updated.id,
                Some(updated.email.clone()),
                ctx.trace_id(),
            ),
            self.config.event_publish_timeout(),
        );

        info!(trace_id = ctx.trace_id(), user_id = %user_id, "Email changed");
        Ok(updated)
    }

    pub async fn list_providers(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
    ) -> IdHubResult<Vec<UserProvider>> {
        ctx.run("provider.list_by_user", self.provider_repo.list_by_user(user_id))
            .await
    }

    /// Remove a provider linkage. A password-less user must keep at
    /// least one provider to sign in with.
    pub async fn unlink_provider(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        provider_type: &str,
    ) -> IdHubResult<()> {
        let providers = self.list_providers(ctx, user_id).await?;
        let link = providers
            .iter()
            .find(|p| p.provider_type == provider_type)
            .ok_or_else(|| IdHubError::NotFound {
                entity: "user_provider".into(),
                id: format!("{user_id}/{provider_type}"),
            })?;

        let user = ctx
            .run("user.get_by_id", self.user_repo.get_by_id(user_id))
            .await?;
        if !user.has_password() && providers.len() <= 1 {
            return Err(IdHubError::invalid_input(
                "cannot unlink the only sign-in method",
            ));
        }

        ctx.run("provider.delete", self.provider_repo.delete(link.id))
            .await?;
        info!(
            trace_id = ctx.trace_id(),
            user_id = %user_id,
            provider_type,
            "Provider unlinked"
        );
        Ok(())
    }
}
