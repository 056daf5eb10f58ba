//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups that find nothing
//! return [`IdHubError::NotFound`](crate::error::IdHubError::NotFound);
//! writes that would break a uniqueness rule return
//! [`IdHubError::Conflict`](crate::error::IdHubError::Conflict). The
//! storage layer enforces uniqueness atomically, so a conflict is the
//! authoritative signal that a concurrent writer won a race.

use uuid::Uuid;

use crate::error::IdHubResult;
use crate::models::{
    profile::{CreateUserProfile, UpdateUserProfile, UserProfile},
    provider::{CreateUserProvider, UpdateUserProvider, UserProvider},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Unique on `email` (stored lower-cased).
pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = IdHubResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = IdHubResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = IdHubResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = IdHubResult<User>> + Send;
    /// Soft delete: clears `is_active` and keeps the row.
    fn delete(&self, id: Uuid) -> impl Future<Output = IdHubResult<()>> + Send;
    /// Remove the row outright. Only for undoing an account whose
    /// creation did not complete; succeeds if the row is already gone.
    fn purge(&self, id: Uuid) -> impl Future<Output = IdHubResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = IdHubResult<PaginatedResult<User>>> + Send;
}

/// Unique on `user_id`.
pub trait UserProfileRepository: Send + Sync {
    fn create(
        &self,
        input: CreateUserProfile,
    ) -> impl Future<Output = IdHubResult<UserProfile>> + Send;
    fn get_by_user_id(&self, user_id: Uuid)
    -> impl Future<Output = IdHubResult<UserProfile>> + Send;
    fn update(
        &self,
        user_id: Uuid,
        input: UpdateUserProfile,
    ) -> impl Future<Output = IdHubResult<UserProfile>> + Send;
}

/// Unique on `(provider_type, provider_user_id)`.
pub trait UserProviderRepository: Send + Sync {
    fn create(
        &self,
        input: CreateUserProvider,
    ) -> impl Future<Output = IdHubResult<UserProvider>> + Send;
    fn get_by_provider(
        &self,
        provider_type: &str,
        provider_user_id: &str,
    ) -> impl Future<Output = IdHubResult<UserProvider>> + Send;
    fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = IdHubResult<Vec<UserProvider>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUserProvider,
    ) -> impl Future<Output = IdHubResult<UserProvider>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = IdHubResult<()>> + Send;
}
