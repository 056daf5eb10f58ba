//! External identity provider linkage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a user to an identity at an external OAuth provider.
///
/// `(provider_type, provider_user_id)` is unique across all users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProvider {
    pub id: Uuid,
    /// e.g. `"google"`.
    pub provider_type: String,
    /// Subject identifier assigned by the provider.
    pub provider_user_id: String,
    pub user_id: Uuid,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserProvider {
    pub provider_type: String,
    pub provider_user_id: String,
    pub user_id: Uuid,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUserProvider {
    pub metadata: Option<serde_json::Value>,
}
